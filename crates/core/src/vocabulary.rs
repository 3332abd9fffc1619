//! The fixed vocabulary used to tag knowledge passages and to filter retrieval.
//!
//! Four categories: zodiac signs, planetary factors, life areas and the 27
//! nakshatras. Parsing is case-insensitive and ignores spaces, hyphens and
//! underscores, so `"purva_phalguni"` and `"Purva Phalguni"` are the same
//! term. A few common alternate spellings emitted by chart libraries are
//! accepted as aliases.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A value that is not part of a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a known {vocabulary}")]
pub struct UnknownTerm {
    pub vocabulary: &'static str,
    pub value: String,
}

fn normalize(term: &str) -> String {
    term.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($variant:ident => $canonical:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every term, in canonical order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The canonical spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $canonical),+
                }
            }

            fn aliases(&self) -> &'static [&'static str] {
                match self {
                    $($name::$variant => &[$($alias),*]),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownTerm;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|term| {
                        normalize(term.as_str()) == wanted
                            || term.aliases().iter().any(|alias| normalize(alias) == wanted)
                    })
                    .ok_or_else(|| UnknownTerm {
                        vocabulary: $label,
                        value: s.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

vocabulary! {
    /// The twelve signs of the sidereal zodiac.
    ZodiacSign, "zodiac sign" {
        Aries => "Aries" | "Mesha",
        Taurus => "Taurus" | "Vrishabha",
        Gemini => "Gemini" | "Mithuna",
        Cancer => "Cancer" | "Karka",
        Leo => "Leo" | "Simha",
        Virgo => "Virgo" | "Kanya",
        Libra => "Libra" | "Tula",
        Scorpio => "Scorpio" | "Vrischika",
        Sagittarius => "Sagittarius" | "Dhanu",
        Capricorn => "Capricorn" | "Makara",
        Aquarius => "Aquarius" | "Kumbha",
        Pisces => "Pisces" | "Meena",
    }
}

vocabulary! {
    /// The nine grahas.
    Planet, "planetary factor" {
        Sun => "Sun" | "Surya",
        Moon => "Moon" | "Chandra",
        Mars => "Mars" | "Mangal",
        Mercury => "Mercury" | "Budh",
        Jupiter => "Jupiter" | "Guru",
        Venus => "Venus" | "Shukra",
        Saturn => "Saturn" | "Shani",
        Rahu => "Rahu",
        Ketu => "Ketu",
    }
}

vocabulary! {
    /// Areas of life the guidance corpus is organised by.
    LifeArea, "life area" {
        Love => "love" | "relationships",
        Spirituality => "spirituality" | "spiritual",
        Career => "career",
    }
}

vocabulary! {
    /// The 27 lunar mansions.
    Nakshatra, "nakshatra" {
        Ashwini => "Ashwini" | "Aswini",
        Bharani => "Bharani",
        Krittika => "Krittika" | "Kritika",
        Rohini => "Rohini",
        Mrigashira => "Mrigashira" | "Mrigasira",
        Ardra => "Ardra" | "Arudra",
        Punarvasu => "Punarvasu",
        Pushya => "Pushya" | "Pushyami",
        Ashlesha => "Ashlesha" | "Aslesha",
        Magha => "Magha",
        PurvaPhalguni => "Purva Phalguni" | "Poorva Phalguni",
        UttaraPhalguni => "Uttara Phalguni",
        Hasta => "Hasta",
        Chitra => "Chitra",
        Swati => "Swati",
        Vishakha => "Vishakha" | "Visakha",
        Anuradha => "Anuradha",
        Jyeshtha => "Jyeshtha" | "Jyeshta",
        Mula => "Mula" | "Moola",
        PurvaAshadha => "Purva Ashadha" | "Poorva Ashadha",
        UttaraAshadha => "Uttara Ashadha",
        Shravana => "Shravana" | "Sravana",
        Dhanishtha => "Dhanishtha" | "Dhanishta",
        Shatabhisha => "Shatabhisha" | "Satabhisha",
        PurvaBhadrapada => "Purva Bhadrapada" | "Poorva Bhadrapada",
        UttaraBhadrapada => "Uttara Bhadrapada",
        Revati => "Revati",
    }
}

/// Comma-separated canonical names, for prompts.
pub fn listing<T: std::fmt::Display>(terms: &[T]) -> String {
    terms.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
