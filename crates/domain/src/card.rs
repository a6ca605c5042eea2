//! Card records from the card catalog
//!
//! Cards are only ever used to enrich display (competitor names, stats). They
//! are never replicated over the bus; topics carry the card id alone.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    MainDeckCard,
    SingleCompetitorCard,
    TornadoCompetitorCard,
}

impl CardType {
    pub fn is_competitor(self) -> bool {
        matches!(
            self,
            CardType::SingleCompetitorCard | CardType::TornadoCompetitorCard
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    Strike,
    Grapple,
    Submission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayOrder {
    Lead,
    Followup,
    Finish,
}

/// A card as exported from the card database.
///
/// Competitor stats are set only for competitor cards; deck number, attack
/// type and play order only for main-deck cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub db_uuid: String,
    pub name: String,
    pub card_type: CardType,
    #[serde(default)]
    pub rules_text: Option<String>,
    #[serde(default)]
    pub errata_text: Option<String>,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub release_set: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub power: Option<u8>,
    #[serde(default)]
    pub agility: Option<u8>,
    #[serde(default)]
    pub strike: Option<u8>,
    #[serde(default)]
    pub submission: Option<u8>,
    #[serde(default)]
    pub grapple: Option<u8>,
    #[serde(default)]
    pub technique: Option<u8>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub deck_card_number: Option<u8>,
    #[serde(default)]
    pub atk_type: Option<AttackType>,
    #[serde(default)]
    pub play_order: Option<PlayOrder>,
}

impl Card {
    pub fn is_competitor(&self) -> bool {
        self.card_type.is_competitor()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.division.as_deref() {
            Some(division) => write!(f, "{} ({})", self.name, division),
            None => f.write_str(&self.name),
        }
    }
}
