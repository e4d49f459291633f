//! Wearable and handheld accessories.

use crate::error::{Result, SundaError};
use serde::{Deserialize, Serialize};

/// An item the subject can be asked to wear or hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accessory {
    /// Sunglasses.
    Sunglasses,
    /// Hat.
    Hat,
    /// Peci cap.
    Peci,
    /// Conical farmer's hat.
    Caping,
    /// Bamboo angklung.
    Angklung,
    /// Traditional pangsi shirt.
    Pangsi,
    /// Jacket.
    Jacket,
}

struct AccessoryEntry {
    slug: &'static str,
    label: &'static str,
    icon: &'static str,
}

// Indexed by `Accessory as usize`.
const ENTRIES: [AccessoryEntry; 7] = [
    AccessoryEntry {
        slug: "sunglasses",
        label: "Kaca Mata",
        icon: "fa-glasses",
    },
    AccessoryEntry {
        slug: "hat",
        label: "Topi",
        icon: "fa-hat-cowboy",
    },
    AccessoryEntry {
        slug: "peci",
        label: "Peci",
        icon: "fa-hat-wizard",
    },
    AccessoryEntry {
        slug: "caping",
        label: "Caping",
        icon: "fa-mountain",
    },
    AccessoryEntry {
        slug: "angklung",
        label: "Angklung",
        icon: "fa-music",
    },
    AccessoryEntry {
        slug: "pangsi",
        label: "Baju Pangsi",
        icon: "fa-shirt",
    },
    AccessoryEntry {
        slug: "jacket",
        label: "Jaket",
        icon: "fa-user-ninja",
    },
];

impl Accessory {
    /// Every accessory, in presentation order.
    pub const ALL: [Accessory; 7] = [
        Accessory::Sunglasses,
        Accessory::Hat,
        Accessory::Peci,
        Accessory::Caping,
        Accessory::Angklung,
        Accessory::Pangsi,
        Accessory::Jacket,
    ];

    fn entry(self) -> &'static AccessoryEntry {
        &ENTRIES[self as usize]
    }

    /// Label used verbatim in prompts.
    pub fn label(self) -> &'static str {
        self.entry().label
    }

    /// Icon tag for front ends.
    pub fn icon(self) -> &'static str {
        self.entry().icon
    }

    /// Command-line identifier.
    pub fn slug(self) -> &'static str {
        self.entry().slug
    }
}

impl std::fmt::Display for Accessory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Accessory {
    type Err = SundaError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Accessory::ALL
            .into_iter()
            .find(|a| a.slug().eq_ignore_ascii_case(needle) || a.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| SundaError::InvalidRequest(format!("unknown accessory '{needle}'")))
    }
}

/// Selected accessories, without duplicates, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Accessory>")]
pub struct AccessorySet(Vec<Accessory>);

impl AccessorySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an accessory. Returns false if it was already selected.
    pub fn insert(&mut self, accessory: Accessory) -> bool {
        if self.contains(accessory) {
            return false;
        }
        self.0.push(accessory);
        true
    }

    /// Removes an accessory. Returns false if it was not selected.
    pub fn remove(&mut self, accessory: Accessory) -> bool {
        let before = self.0.len();
        self.0.retain(|a| *a != accessory);
        self.0.len() != before
    }

    /// Selects the accessory if absent, deselects it otherwise.
    pub fn toggle(&mut self, accessory: Accessory) {
        if !self.remove(accessory) {
            self.0.push(accessory);
        }
    }

    /// Returns true if the accessory is selected.
    pub fn contains(&self, accessory: Accessory) -> bool {
        self.0.contains(&accessory)
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of selected accessories.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates in selection order.
    pub fn iter(&self) -> impl Iterator<Item = Accessory> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Accessory> for AccessorySet {
    fn from_iter<I: IntoIterator<Item = Accessory>>(iter: I) -> Self {
        let mut set = Self::new();
        for accessory in iter {
            set.insert(accessory);
        }
        set
    }
}

impl From<Vec<Accessory>> for AccessorySet {
    fn from(accessories: Vec<Accessory>) -> Self {
        accessories.into_iter().collect()
    }
}
