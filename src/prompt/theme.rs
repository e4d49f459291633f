//! Background theme presets.

use crate::error::{Result, SundaError};
use serde::{Deserialize, Serialize};

/// A named background scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    /// Tea plantation in Puncak.
    TeaGarden,
    /// Rice terraces below Mount Salak.
    RiceFieldSalak,
    /// Jungle waterfall (curug).
    Waterfall,
    /// Village river.
    River,
    /// Traditional Sundanese village.
    Village,
    /// Eiffel Tower, Paris.
    Eiffel,
    /// Big Ben, London.
    London,
    /// Mount Fuji, Japan.
    Fuji,
    /// Great Wall of China.
    GreatWall,
    /// Statue of Liberty, New York.
    Liberty,
}

/// Display label and scene sentence for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePreset {
    /// Theme tag this entry belongs to.
    pub theme: Theme,
    /// Stable identifier used on the command line.
    pub slug: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Scene description fed into prompts.
    pub description: &'static str,
}

// Indexed by `Theme as usize`; keep in declaration order.
const PRESETS: [ThemePreset; 10] = [
    ThemePreset {
        theme: Theme::TeaGarden,
        slug: "tea-garden",
        label: "Kebun Teh (Tea Garden)",
        description: "A sprawling, lush green tea plantation in Puncak, West Java, morning mist, hyper-realistic.",
    },
    ThemePreset {
        theme: Theme::RiceFieldSalak,
        slug: "rice-field-salak",
        label: "Sawah & Gunung Salak",
        description: "Beautiful terraced rice fields in Bogor with a clear view of Mount Salak in the background, blue sky, hyper-realistic.",
    },
    ThemePreset {
        theme: Theme::Waterfall,
        slug: "waterfall",
        label: "Curug (Waterfall)",
        description: "A majestic hidden waterfall (Curug) in a deep Sundanese jungle, crystalline water, sunlight rays, 8k resolution.",
    },
    ThemePreset {
        theme: Theme::River,
        slug: "river",
        label: "Sungai (River)",
        description: "A clean, rocky river flowing through a quiet Sundanese village, bamboo trees, midday sun, photorealistic.",
    },
    ThemePreset {
        theme: Theme::Village,
        slug: "village",
        label: "Pedesaan (Village)",
        description: "A peaceful traditional Sundanese village, houses with 'Julang Ngapak' roofs, surrounded by greenery.",
    },
    ThemePreset {
        theme: Theme::Eiffel,
        slug: "eiffel",
        label: "Menara Eiffel (Paris)",
        description: "The Eiffel Tower in Paris, France, under a clear blue sky with beautiful flower gardens in the foreground, cinematic lighting.",
    },
    ThemePreset {
        theme: Theme::London,
        slug: "london",
        label: "Big Ben (London)",
        description: "Big Ben and the Palace of Westminster in London, moody overcast sky, Thames river in the foreground with a red bus passing by.",
    },
    ThemePreset {
        theme: Theme::Fuji,
        slug: "fuji",
        label: "Gunung Fuji (Japan)",
        description: "Mount Fuji in Japan with pink cherry blossoms (sakura) framing the view, clear lake reflecting the mountain, hyper-realistic.",
    },
    ThemePreset {
        theme: Theme::GreatWall,
        slug: "great-wall",
        label: "Tembok Besar (Great Wall)",
        description: "The Great Wall of China winding along the top of green, lush mountains, bright clear sky, midday sun, photorealistic, 8k resolution.",
    },
    ThemePreset {
        theme: Theme::Liberty,
        slug: "liberty",
        label: "Patung Liberty (Liberty)",
        description: "The Statue of Liberty standing tall on Liberty Island, New York Harbor, viewed from the green grassy park nearby, bright blue sky with wispy clouds, cinematic lighting.",
    },
];

impl Theme {
    /// Every theme, in presentation order.
    pub const ALL: [Theme; 10] = [
        Theme::TeaGarden,
        Theme::RiceFieldSalak,
        Theme::Waterfall,
        Theme::River,
        Theme::Village,
        Theme::Eiffel,
        Theme::London,
        Theme::Fuji,
        Theme::GreatWall,
        Theme::Liberty,
    ];

    /// Returns the preset table entry for this theme.
    pub fn preset(self) -> &'static ThemePreset {
        &PRESETS[self as usize]
    }

    /// Returns the scene description used in prompts.
    pub fn description(self) -> &'static str {
        self.preset().description
    }

    /// Returns the display label.
    pub fn label(self) -> &'static str {
        self.preset().label
    }

    /// Returns the command-line identifier.
    pub fn slug(self) -> &'static str {
        self.preset().slug
    }

    /// Returns all preset entries.
    pub fn presets() -> &'static [ThemePreset] {
        &PRESETS
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::TeaGarden
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Theme {
    type Err = SundaError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        PRESETS
            .iter()
            .find(|p| p.slug.eq_ignore_ascii_case(needle))
            .map(|p| p.theme)
            .ok_or_else(|| SundaError::InvalidRequest(format!("unknown theme '{needle}'")))
    }
}
