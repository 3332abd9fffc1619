//! Prompt text for the planner and the composer.

use std::fmt::Write;

use chrono::NaiveDate;
use nakshatra_core::chart::ChartSummary;
use nakshatra_core::knowledge::{ContextCategory, KnowledgePassage};
use nakshatra_core::message::{Message, Role};
use nakshatra_core::profile::Language;
use nakshatra_core::vocabulary::{LifeArea, Nakshatra, Planet, ZodiacSign, listing};

const MAX_ASPECTS: usize = 5;

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("Unknown")
}

/// Key positions block shared by both prompts.
pub fn key_positions(chart: &ChartSummary) -> String {
    let kp = &chart.key_positions;
    format!(
        "Key Positions:\n\
         - Sun: {} (Nakshatra: {}, Nakshatra Lord: {})\n\
         - Moon: {} (Nakshatra: {}, Nakshatra Lord: {})\n\
         - Ascendant (Lagna): {} (Lagna Lord: {})\n",
        or_unknown(kp.sun.sign.as_deref()),
        or_unknown(kp.sun.nakshatra.as_deref()),
        or_unknown(kp.sun.nakshatra_lord.as_deref()),
        or_unknown(kp.moon.sign.as_deref()),
        or_unknown(kp.moon.nakshatra.as_deref()),
        or_unknown(kp.moon.nakshatra_lord.as_deref()),
        or_unknown(kp.ascendant.sign.as_deref()),
        or_unknown(kp.lagna_lord.as_deref()),
    )
}

/// The full chart grounding block for the composer.
///
/// Key positions, planet placements, the dasha running on `today` and the
/// first few aspects. Sections with no data are left out.
pub fn chart_summary(chart: &ChartSummary, today: NaiveDate) -> String {
    let mut out = key_positions(chart);

    if !chart.planets.is_empty() {
        out.push_str("\nPlanetary Positions:\n");
        for planet in &chart.planets {
            let house = planet.house.map_or_else(|| "Unknown".to_string(), |h| h.to_string());
            let _ = write!(out, "- {}: {} in House {}", planet.name, planet.sign, house);
            if let Some(nakshatra) = &planet.nakshatra {
                let _ = write!(out, " (Nakshatra: {nakshatra})");
            }
            if planet.is_retrograde == Some(true) {
                out.push_str(" (Retrograde)");
            }
            out.push('\n');
        }
    }

    if let Some(current) = chart.current_dasha(today) {
        out.push_str("\nCurrent Vimshottari Dasa Period:\n");
        let _ = writeln!(out, "- {}: {} to {}", current.dasha, current.dasha_start, current.dasha_end);
        if let Some(bhukti) = &current.bhukti {
            let _ = writeln!(out, "  - Current Bhukti: {} ({} to {})", bhukti.lord, bhukti.start, bhukti.end);
        }
    }

    if !chart.aspects.is_empty() {
        out.push_str("\nPlanetary Aspects:\n");
        for aspect in chart.aspects.iter().take(MAX_ASPECTS) {
            let _ = writeln!(
                out,
                "- {} aspects {} ({}, {}°)",
                aspect.first, aspect.second, aspect.kind, aspect.degrees
            );
        }
    }

    out
}

fn history_block(history: &[Message], excerpt_chars: usize) -> String {
    let mut out = String::new();
    for message in history {
        let speaker = match message.role {
            Role::User => "User",
            Role::Assistant => "Astrologer",
            Role::System => continue,
        };
        let _ = writeln!(out, "- {speaker}: {}", message.excerpt(excerpt_chars));
    }
    out
}

/// System prompt for the retrieval planner.
pub fn planner_system(
    chart: Option<&ChartSummary>,
    history: &[Message],
    last_context: &[ContextCategory],
    excerpt_chars: usize,
) -> String {
    let mut out = String::from(
        "You are an expert in Vedic astrology deciding whether a question needs material \
         from the astrology knowledge base before it can be answered.\n\n\
         Decide:\n\
         1. needs_retrieval: true only when specific astrological material must be fetched. \
         Set it to false when the question is answerable from general astrological knowledge, \
         or when the needed information already appears in the recent conversation below.\n\
         2. filters (only when retrieving): restrict the search to the native's own placements.\n\
         \x20  - zodiac: ONLY the native's Sun, Moon or Ascendant sign. Sun sign for personality \
         and identity, Moon sign for emotions, Ascendant for general life. Never signs of other planets.\n\
         \x20  - planet: planets relevant to the question.\n\
         \x20  - life_area: love, spirituality or career when the question is about that area.\n\
         \x20  - nakshatra: the Sun or Moon nakshatra when the question is about nakshatras.\n\
         3. query (only when retrieving): a concise 5-6 keyword semantic search query, \
         e.g. \"Leo sun sign personality traits career\".\n\n",
    );

    let _ = writeln!(out, "Available Zodiac Signs: {}", listing(ZodiacSign::ALL));
    let _ = writeln!(out, "Available Planets: {}", listing(Planet::ALL));
    let _ = writeln!(out, "Available Life Areas: {}", listing(LifeArea::ALL));
    let _ = writeln!(out, "Available Nakshatras: {}\n", listing(Nakshatra::ALL));

    match chart {
        Some(chart) => {
            out.push_str("User's Kundali:\n");
            out.push_str(&key_positions(chart));
            let planets: Vec<String> = chart.planets.iter().map(|p| format!("{}: {}", p.name, p.sign)).collect();
            let _ = writeln!(out, "- Planets: {}\n", planets.join(", "));
        }
        None => out.push_str("User's Kundali: not available\n\n"),
    }

    if !history.is_empty() {
        out.push_str("Recent Conversation:\n");
        out.push_str(&history_block(history, excerpt_chars));
        out.push_str(
            "IMPORTANT: if the recent conversation already answers the current question, \
             set needs_retrieval to false.\n\n",
        );
    }

    if !last_context.is_empty() {
        let labels: Vec<&str> = last_context.iter().map(ContextCategory::as_str).collect();
        let _ = writeln!(out, "Previous Context Used: {}\n", labels.join(", "));
    }

    out.push_str(
        "Inappropriate requests: for NSFW, dangerous, illegal or harmful requests, or topics \
         unrelated to astrology, set needs_retrieval to false and query to null.\n",
    );
    out
}

/// System prompt for the final answer.
pub fn composer_system(
    chart: Option<&ChartSummary>,
    passages: &[KnowledgePassage],
    language: Language,
    today: NaiveDate,
) -> String {
    let mut out = String::from(
        "You are an expert Vedic astrologer with decades of experience in Jyotish Shastra. \
         You speak with the authority of traditional knowledge while staying warm and \
         empathetic, and you treat astrology as guidance that respects free will.\n\n\
         Response guidelines:\n\
         - Keep answers concise, around 30-50 words, direct and encouraging.\n\
         - Reference the specific placements in the chart below when relevant.\n\
         - Offer practical, actionable guidance.\n\
         - Stay within astrology: no medical, legal or financial advice.\n\
         - Avoid jargon; keep it simple.\n\
         - For questions about today, this week or this month, relate the answer to the \
         current dasha and bhukti.\n\n",
    );

    let _ = writeln!(out, "Today's date: {today}\n");

    match chart {
        Some(chart) => {
            let _ = writeln!(out, "Native: {}\n", chart.user_name);
            out.push_str(&chart_summary(chart, today));
        }
        None => out.push_str("No kundali is available for this user.\n"),
    }

    if !passages.is_empty() {
        out.push_str("\nRelevant Astrological Information:\n");
        for (i, passage) in passages.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, passage.text);
        }
    }

    let _ = write!(
        out,
        "\nRespond ONLY in {}. Do not mix languages.",
        language.display_name()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{corpus, sample_chart};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn chart_summary_lists_positions_dasha_and_aspects() {
        let summary = chart_summary(&sample_chart(), today());
        assert!(summary.contains("- Sun: Leo (Nakshatra: Magha, Nakshatra Lord: Ketu)"));
        assert!(summary.contains("- Ascendant (Lagna): Aries (Lagna Lord: Mars)"));
        assert!(summary.contains("- Saturn: Capricorn in House 10 (Nakshatra: Shravana) (Retrograde)"));
        assert!(summary.contains("- Rahu: 17-08-2009 to 16-08-2027"));
        assert!(summary.contains("Current Bhukti: Moon"));
        assert!(summary.contains("- Mars aspects Saturn (Trine, 120°)"));
    }

    #[test]
    fn chart_summary_omits_dasha_outside_known_periods() {
        let far_future = NaiveDate::from_ymd_opt(2100, 1, 1).unwrap();
        assert!(!chart_summary(&sample_chart(), far_future).contains("Vimshottari"));
    }

    #[test]
    fn composer_prompt_numbers_passages_and_sets_language() {
        let prompt = composer_system(Some(&sample_chart()), &corpus(), Language::Hindi, today());
        assert!(prompt.contains("1. Leo natives are generous"));
        assert!(prompt.contains("3. Saturn rewards"));
        assert!(prompt.ends_with("Respond ONLY in Hindi. Do not mix languages."));
    }

    #[test]
    fn planner_prompt_truncates_history_and_lists_context() {
        let long = "x".repeat(500);
        let history = vec![Message::user(long), Message::assistant("short answer")];
        let prompt = planner_system(Some(&sample_chart()), &history, &[ContextCategory::ZodiacTraits], 200);

        assert!(prompt.contains("Available Nakshatras: Ashwini"));
        assert!(prompt.contains("- Planets: Sun: Leo, Moon: Virgo"));
        assert!(prompt.contains(&format!("- User: {}...", "x".repeat(200))));
        assert!(!prompt.contains(&"x".repeat(201)));
        assert!(prompt.contains("Previous Context Used: zodiac_traits"));
    }
}
