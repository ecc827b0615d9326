use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sentinel hashed for an empty holdings list, so "no holdings" is
/// distinguishable from the hash of an empty string.
const EMPTY_PORTFOLIO_SENTINEL: &str = "EMPTY_PORTFOLIO";

/// A user's position in one symbol: how many units are held and at what
/// average buy price.
///
/// **Equality** is based solely on `symbol` — a portfolio holds at most
/// one position per symbol, so two holdings with the same symbol refer
/// to the same position regardless of quantity or cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker symbol, uppercased (e.g., "AAPL", "005930.KS")
    pub symbol: String,

    /// Units held. Always positive.
    pub quantity: Decimal,

    /// Average buy price per unit. Always positive.
    pub average_cost: Decimal,
}

impl PartialEq for Holding {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Holding {}

impl Holding {
    pub fn new(symbol: impl Into<String>, quantity: Decimal, average_cost: Decimal) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            quantity,
            average_cost,
        }
    }

    /// Total acquisition cost of this position (`average_cost * quantity`).
    #[must_use]
    pub fn cost(&self) -> Decimal {
        self.average_cost * self.quantity
    }
}

/// Deterministic content hash over a holdings set, used to detect whether
/// a portfolio changed since the last AI analysis.
///
/// Holdings are sorted by symbol before rendering so the fingerprint is
/// independent of retrieval order. Each holding is rendered as
/// `symbol:quantity:average_cost` using `Decimal`'s exact display form
/// (not a rounded display form), joined with `|`, then SHA-256 hashed.
#[must_use]
pub fn fingerprint(holdings: &[Holding]) -> String {
    if holdings.is_empty() {
        return hash_hex(EMPTY_PORTFOLIO_SENTINEL);
    }

    let mut sorted: Vec<&Holding> = holdings.iter().collect();
    sorted.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let rendered = sorted
        .iter()
        .map(|h| format!("{}:{}:{}", h.symbol, h.quantity, h.average_cost))
        .collect::<Vec<_>>()
        .join("|");

    hash_hex(&rendered)
}

fn hash_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}
