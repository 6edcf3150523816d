//! Static catalog of personal color types

use serde::Serialize;
use std::fmt;

/// One entry of the personal color catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersonalColorType {
    pub id: u8,
    /// Stable machine name, e.g. `spring-light`
    pub slug: &'static str,
    pub name: &'static str,
    /// Short evocative label shown next to the name
    pub visual_name: &'static str,
    pub description: &'static str,
    /// Recommended colors, `#RRGGBB`
    pub palette: [&'static str; 5],
}

impl PersonalColorType {
    /// Get the season family this type belongs to
    pub fn season(&self) -> Season {
        match self.id {
            0 | 1 => Season::Spring,
            2 | 3 => Season::Summer,
            4 | 5 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Check if the type suits warm (yellow) undertones
    pub fn is_warm(&self) -> bool {
        self.season().is_warm()
    }

    /// Palette colors as RGB triples
    pub fn palette_rgb(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.palette.iter().filter_map(|hex| parse_hex(hex))
    }
}

impl fmt::Display for PersonalColorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Spring and autumn carry yellow undertones
    pub fn is_warm(self) -> bool {
        matches!(self, Season::Spring | Season::Autumn)
    }
}

pub static CATALOG: [PersonalColorType; 8] = [
    PersonalColorType {
        id: 0,
        slug: "spring-light",
        name: "Spring Light",
        visual_name: "Peach Blossom",
        description: "Light, warm and clear. Soft pastels with a golden base keep your complexion fresh and luminous.",
        palette: ["#FFDAB9", "#FFE4B5", "#F8C8A0", "#FFB7A5", "#FFF1C1"],
    },
    PersonalColorType {
        id: 1,
        slug: "spring-bright",
        name: "Spring Bright",
        visual_name: "Golden",
        description: "Warm and vivid. Saturated corals, golds and fresh greens bring out your natural glow.",
        palette: ["#FFD700", "#FFA500", "#FF8C00", "#FF7F50", "#FF6347"],
    },
    PersonalColorType {
        id: 2,
        slug: "summer-light",
        name: "Summer Light",
        visual_name: "Lavender Mist",
        description: "Light, cool and airy. Powdery blues, lilacs and rose pinks flatter your delicate contrast.",
        palette: ["#E6E6FA", "#B0C4DE", "#D8BFD8", "#F4C2C2", "#AFDBF5"],
    },
    PersonalColorType {
        id: 3,
        slug: "summer-mute",
        name: "Summer Mute",
        visual_name: "Dusty Rose",
        description: "Cool and soft. Greyed roses, muted mauves and slate blues harmonise with your gentle coloring.",
        palette: ["#C4A4A7", "#A3A5C3", "#B497B8", "#8FA1B3", "#D3B8AE"],
    },
    PersonalColorType {
        id: 4,
        slug: "autumn-mute",
        name: "Autumn Mute",
        visual_name: "Camel",
        description: "Warm and soft. Earthy beiges, khakis and muted terracotta blend naturally with your skin.",
        palette: ["#C19A6B", "#A0785A", "#BDB76B", "#CC7F5B", "#8F9779"],
    },
    PersonalColorType {
        id: 5,
        slug: "autumn-deep",
        name: "Autumn Deep",
        visual_name: "Burnt Umber",
        description: "Warm and rich. Deep browns, olive and burnt orange give you depth and warmth.",
        palette: ["#8B4513", "#6B4423", "#556B2F", "#B5651D", "#800000"],
    },
    PersonalColorType {
        id: 6,
        slug: "winter-bright",
        name: "Winter Bright",
        visual_name: "Fuchsia",
        description: "Cool and vivid. Crisp jewel tones and pure white match your high contrast.",
        palette: ["#FF00FF", "#0047AB", "#DC143C", "#00A86B", "#FFFFFF"],
    },
    PersonalColorType {
        id: 7,
        slug: "winter-deep",
        name: "Winter Deep",
        visual_name: "Midnight",
        description: "Cool and deep. Navy, burgundy, charcoal and black frame your striking features.",
        palette: ["#191970", "#800020", "#36454F", "#000000", "#4B0082"],
    },
];

/// Look up a type by id. Ids outside the catalog fall back to id 0.
pub fn lookup(id: u8) -> &'static PersonalColorType {
    CATALOG.get(id as usize).unwrap_or(&CATALOG[0])
}

/// Find a type by its slug, ignoring ASCII case
pub fn find_by_slug(slug: &str) -> Option<&'static PersonalColorType> {
    CATALOG.iter().find(|t| t.slug.eq_ignore_ascii_case(slug))
}

fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_match_positions() {
        for (i, entry) in CATALOG.iter().enumerate() {
            assert_eq!(entry.id as usize, i);
        }
    }

    #[test]
    fn test_unknown_id_falls_back_to_first() {
        assert_eq!(lookup(3).slug, "summer-mute");
        assert_eq!(lookup(8).id, 0);
        assert_eq!(lookup(255).id, 0);
    }

    #[test]
    fn test_palettes_are_valid_hex() {
        for entry in &CATALOG {
            assert_eq!(entry.palette_rgb().count(), 5, "{} has a malformed color", entry.slug);
        }
        assert_eq!(lookup(1).palette_rgb().next(), Some([0xFF, 0xD7, 0x00]));
    }

    #[test]
    fn test_seasons_and_warmth() {
        assert_eq!(lookup(0).season(), Season::Spring);
        assert!(lookup(5).is_warm());
        assert!(!lookup(2).is_warm());
        assert_eq!(lookup(7).season(), Season::Winter);
    }

    #[test]
    fn test_find_by_slug() {
        assert_eq!(find_by_slug("Autumn-Deep").map(|t| t.id), Some(5));
        assert!(find_by_slug("golden").is_none());
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert_eq!(parse_hex("#00ff7f"), Some([0, 255, 127]));
        assert_eq!(parse_hex("00ff7f"), None);
        assert_eq!(parse_hex("#00ff7"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }
}
