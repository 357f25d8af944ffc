//! Token shop packages.

use serde::{Deserialize, Serialize};

/// A purchasable bundle of tokens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct TokenPackage {
    pub id: u32,
    pub name: String,
    pub tokens: u64,
    /// Price in the store currency.
    pub price: f64,
    #[serde(default)]
    pub bonus: u64,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub description: String,
}

impl TokenPackage {
    /// Tokens credited on purchase, bonus included.
    pub fn total_tokens(&self) -> u64 {
        self.tokens + self.bonus
    }

    /// The packages offered in the shop.
    pub fn catalog() -> Vec<TokenPackage> {
        [
            (1, "Starter Pack", 50, 0.99, 0, false, "Perfect for trying out"),
            (2, "Basic Pack", 120, 1.99, 20, false, "+20 bonus tokens"),
            (3, "Popular Pack", 300, 4.99, 50, true, "+50 bonus tokens, best value"),
            (4, "Premium Pack", 650, 9.99, 150, false, "+150 bonus tokens"),
            (5, "Ultimate Pack", 1500, 19.99, 500, false, "+500 bonus tokens, best deal"),
            (6, "Mega Pack", 3500, 49.99, 1500, false, "+1500 bonus tokens, maximum value"),
        ]
        .into_iter()
        .map(|(id, name, tokens, price, bonus, popular, description)| TokenPackage {
            id,
            name: name.to_string(),
            tokens,
            price,
            bonus,
            popular,
            description: description.to_string(),
        })
        .collect()
    }

    /// Look up a catalog package by id.
    pub fn find(id: u32) -> Option<TokenPackage> {
        Self::catalog().into_iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_totals() {
        let catalog = TokenPackage::catalog();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog[0].total_tokens(), 50);
        assert_eq!(catalog[5].total_tokens(), 5000);
        assert_eq!(catalog.iter().filter(|p| p.popular).count(), 1);
    }

    #[test]
    fn test_find() {
        assert_eq!(TokenPackage::find(3).map(|p| p.total_tokens()), Some(350));
        assert!(TokenPackage::find(99).is_none());
    }
}
