//! Payment channel detection.
//!
//! Priority order: the bank's own operation code first, then text patterns
//! over title + counterparty. Every pattern is also tried against the
//! ASCII-folded text, so OCR output without diacritics still matches.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::strip_diacritics;

/// The payment rail a transaction used.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Card,
    Transfer,
    BlikP2p,
    BlikMerchant,
    Cash,
    Refund,
    Fee,
    #[default]
    Other,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Card => "CARD",
            Channel::Transfer => "TRANSFER",
            Channel::BlikP2p => "BLIK_P2P",
            Channel::BlikMerchant => "BLIK_MERCHANT",
            Channel::Cash => "CASH",
            Channel::Refund => "REFUND",
            Channel::Fee => "FEE",
            Channel::Other => "OTHER",
        }
    }

    /// Parse from the persisted string form.
    pub fn parse(s: &str) -> Self {
        match s {
            "CARD" => Channel::Card,
            "TRANSFER" => Channel::Transfer,
            "BLIK_P2P" => Channel::BlikP2p,
            "BLIK_MERCHANT" => Channel::BlikMerchant,
            "CASH" => Channel::Cash,
            "REFUND" => Channel::Refund,
            "FEE" => Channel::Fee,
            _ => Channel::Other,
        }
    }
}

static PHONE_TRANSFER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)przelew\s*(na|z)\s*telefon").expect("static regex"));
static BLIK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)blik").expect("static regex"));
static CARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)kart[aąy]|card|visa|mastercard|maestro").expect("static regex"));
static CASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)bankomat|atm|wyp[łl]ata\s*got[oó]wk|wp[łl]ata\s*got[oó]wk")
        .expect("static regex")
});
static REFUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)zwrot|refund|korekta").expect("static regex"));
static FEE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)op[łl]ata|prowizja|odsetki|fee|commission").expect("static regex"));
static TRANSFER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)przelew|transfer|zleceni").expect("static regex"));

fn matches_either(re: &Regex, text: &str, ascii: &str) -> bool {
    re.is_match(text) || re.is_match(ascii)
}

/// Detect the transaction channel from the bank code and free text.
pub fn detect_channel(bank_category: &str, title: &str, counterparty: &str) -> Channel {
    let bc = bank_category.to_uppercase();
    let text = format!("{} {}", title, counterparty).to_lowercase();
    let ascii = strip_diacritics(&text);

    // Bank operation codes take precedence over text heuristics.
    const CODE_MAP: &[(&str, Channel)] = &[
        ("TR.KART", Channel::Card),
        ("PRZELEW", Channel::Transfer),
        ("P.BLIK", Channel::BlikP2p), // refined below
        ("TR.BLIK", Channel::BlikMerchant),
        ("ST.ZLEC", Channel::Transfer),
        ("OPŁATA", Channel::Fee),
        ("OPLATA", Channel::Fee),
        ("PROWIZJA", Channel::Fee),
        ("ODSETKI", Channel::Fee),
    ];
    for (code, channel) in CODE_MAP {
        if bc.contains(code) {
            if *channel == Channel::BlikP2p {
                // P.BLIK covers both phone transfers and merchant payments.
                if matches_either(&PHONE_TRANSFER_RE, &text, &ascii) {
                    return Channel::BlikP2p;
                }
                return Channel::BlikMerchant;
            }
            return *channel;
        }
    }

    if matches_either(&BLIK_RE, &text, &ascii) {
        if matches_either(&PHONE_TRANSFER_RE, &text, &ascii) {
            return Channel::BlikP2p;
        }
        return Channel::BlikMerchant;
    }
    if matches_either(&CARD_RE, &text, &ascii) {
        return Channel::Card;
    }
    if matches_either(&CASH_RE, &text, &ascii) {
        return Channel::Cash;
    }
    if matches_either(&REFUND_RE, &text, &ascii) {
        return Channel::Refund;
    }
    if matches_either(&FEE_RE, &text, &ascii) {
        return Channel::Fee;
    }
    if matches_either(&TRANSFER_RE, &text, &ascii) {
        return Channel::Transfer;
    }

    Channel::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_codes() {
        assert_eq!(detect_channel("TR.KART", "", ""), Channel::Card);
        assert_eq!(detect_channel("ST.ZLEC", "", ""), Channel::Transfer);
        assert_eq!(detect_channel("PRZELEW", "", ""), Channel::Transfer);
        assert_eq!(detect_channel("TR.BLIK", "", ""), Channel::BlikMerchant);
        assert_eq!(detect_channel("OPŁATA", "", ""), Channel::Fee);
    }

    #[test]
    fn test_blik_refinement() {
        assert_eq!(
            detect_channel("P.BLIK", "Przelew na telefon", ""),
            Channel::BlikP2p
        );
        assert_eq!(
            detect_channel("P.BLIK", "Zakup w sklepie", ""),
            Channel::BlikMerchant
        );
        // Text-only BLIK with phone transfer wording.
        assert_eq!(
            detect_channel("", "BLIK przelew z telefonu", ""),
            Channel::BlikP2p
        );
    }

    #[test]
    fn test_text_fallbacks() {
        assert_eq!(detect_channel("", "Bankomat", ""), Channel::Cash);
        assert_eq!(detect_channel("", "Wypłata gotówki", ""), Channel::Cash);
        // ASCII-folded form must match too.
        assert_eq!(detect_channel("", "Wyplata gotowki", ""), Channel::Cash);
        assert_eq!(detect_channel("", "Zwrot towaru", ""), Channel::Refund);
        assert_eq!(detect_channel("", "Prowizja za prowadzenie", ""), Channel::Fee);
        assert_eq!(detect_channel("", "Przelew własny", ""), Channel::Transfer);
        assert_eq!(detect_channel("", "cokolwiek", ""), Channel::Other);
    }

    #[test]
    fn test_channel_parse_roundtrip() {
        for ch in [
            Channel::Card,
            Channel::Transfer,
            Channel::BlikP2p,
            Channel::BlikMerchant,
            Channel::Cash,
            Channel::Refund,
            Channel::Fee,
            Channel::Other,
        ] {
            assert_eq!(Channel::parse(ch.as_str()), ch);
        }
    }
}
