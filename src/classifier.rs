//! Line-oriented heuristics that turn free-form caption or page text into a
//! title, an ingredient list and a step list.
//!
//! Nothing here fails: text that does not look like a recipe produces empty
//! lists.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-•*]\s*").unwrap());
static ENUMERATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)]\s*").unwrap());

/// Lines inspected for a title before falling back to the whole text
const TITLE_SCAN_LINES: usize = 5;
const TITLE_MIN_LEN: usize = 3;
const TITLE_FALLBACK_MIN_LEN: usize = 10;

const SECTION_INGREDIENT_MIN_LEN: usize = 2;
const SECTION_STEP_MIN_LEN: usize = 5;
const LOOSE_INGREDIENT_MIN_LEN: usize = 3;
const LOOSE_STEP_MIN_LEN: usize = 10;

/// Keyword tables driving the classifier. Overridable per platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// Lines containing one of these start the ingredient section
    pub ingredient_headers: Vec<String>,
    /// Lines containing one of these start the instruction section
    pub instruction_headers: Vec<String>,
    pub unit_keywords: Vec<String>,
    pub verb_keywords: Vec<String>,
    /// Characters stripped from the front of a title candidate
    pub decorative_prefixes: String,
    /// Lines starting with this are hashtags or comments and never classified
    pub comment_prefix: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            ingredient_headers: strings(&[
                "ingredients:",
                "ingredient:",
                "what you need:",
                "you'll need:",
            ]),
            instruction_headers: strings(&[
                "instructions:",
                "directions:",
                "method:",
                "steps:",
                "how to:",
                "preparation:",
            ]),
            unit_keywords: strings(&[
                "cup", "tbsp", "tsp", "oz", "lb", "gram", "kg", "ml", "l",
            ]),
            verb_keywords: strings(&[
                "heat", "preheat", "mix", "stir", "add", "cook", "bake", "combine", "whisk",
                "fold",
            ]),
            decorative_prefixes: "🍳👨👩\u{200D}📝📋📖🔪🥘🍽\u{FE0F}".to_string(),
            comment_prefix: "#".to_string(),
        }
    }
}

impl ClassifierRules {
    fn is_comment(&self, line: &str) -> bool {
        !self.comment_prefix.is_empty() && line.starts_with(&self.comment_prefix)
    }

    fn is_ingredient_header(&self, lowered: &str) -> bool {
        self.ingredient_headers
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    }

    fn is_instruction_header(&self, lowered: &str) -> bool {
        self.instruction_headers
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    }

    fn mentions_unit(&self, line: &str) -> bool {
        tokens(line).any(|token| {
            let token = token.trim_start_matches(char::is_numeric);
            self.unit_keywords
                .iter()
                .any(|unit| inflection_of(token, &unit.to_lowercase()))
        })
    }

    fn mentions_verb(&self, line: &str) -> bool {
        tokens(line).any(|token| {
            self.verb_keywords
                .iter()
                .any(|verb| inflection_of(&token, &verb.to_lowercase()))
        })
    }
}

/// Classifier output. Fields are empty when nothing qualified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub title: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Neither,
    Ingredients,
    Instructions,
}

/// Classify `raw_text` line by line.
///
/// Header-delimited sections are preferred. Only when they yield nothing at
/// all does the unit/verb keyword fallback run.
pub fn classify(raw_text: &str, rules: &ClassifierRules) -> Classified {
    let title = extract_title(raw_text, rules);
    let (mut ingredients, mut steps) = parse_sections(raw_text, rules);
    if ingredients.is_empty() && steps.is_empty() {
        (ingredients, steps) = parse_unstructured(raw_text, rules);
    }

    Classified {
        title,
        ingredients,
        steps,
    }
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

pub fn extract_title(raw_text: &str, rules: &ClassifierRules) -> String {
    let decorated = non_empty_lines(raw_text)
        .take(TITLE_SCAN_LINES)
        .filter(|line| !rules.is_comment(line))
        .map(|line| {
            line.trim_start_matches(|c: char| rules.decorative_prefixes.contains(c))
                .trim()
        })
        .find(|candidate| char_len(candidate) > TITLE_MIN_LEN);
    if let Some(title) = decorated {
        return title.to_string();
    }

    non_empty_lines(raw_text)
        .filter(|line| !rules.is_comment(line))
        .find(|line| char_len(line) > TITLE_FALLBACK_MIN_LEN)
        .map(str::to_string)
        .unwrap_or_default()
}

fn parse_sections(raw_text: &str, rules: &ClassifierRules) -> (Vec<String>, Vec<String>) {
    let mut ingredients = Vec::new();
    let mut steps = Vec::new();
    let mut section = Section::Neither;

    for line in non_empty_lines(raw_text) {
        let lowered = line.to_lowercase();
        if rules.is_ingredient_header(&lowered) {
            section = Section::Ingredients;
            continue;
        }
        if rules.is_instruction_header(&lowered) {
            section = Section::Instructions;
            continue;
        }
        if rules.is_comment(line) {
            continue;
        }

        match section {
            Section::Ingredients => {
                if let Some(item) = strip_marker(&BULLET, line, SECTION_INGREDIENT_MIN_LEN) {
                    ingredients.push(item);
                }
            }
            Section::Instructions => {
                // Numbered steps are measured with their marker, so "1. Mix" survives
                if char_len(line) <= SECTION_STEP_MIN_LEN {
                    continue;
                }
                if let Some(item) = strip_marker(&ENUMERATOR, line, 0) {
                    steps.push(item);
                }
            }
            Section::Neither => {}
        }
    }

    (ingredients, steps)
}

fn parse_unstructured(raw_text: &str, rules: &ClassifierRules) -> (Vec<String>, Vec<String>) {
    let mut ingredients = Vec::new();
    let mut steps = Vec::new();

    for line in non_empty_lines(raw_text).filter(|line| !rules.is_comment(line)) {
        // Ingredient cues are checked first; a line never lands in both lists
        if rules.mentions_unit(line) {
            if let Some(item) = strip_marker(&BULLET, line, LOOSE_INGREDIENT_MIN_LEN) {
                ingredients.push(item);
            }
        } else if rules.mentions_verb(line) {
            if let Some(item) = strip_marker(&ENUMERATOR, line, LOOSE_STEP_MIN_LEN) {
                steps.push(item);
            }
        }
    }

    (ingredients, steps)
}

/// Strip a leading list marker. What remains must be longer than `min_len`.
fn strip_marker(marker: &Regex, line: &str, min_len: usize) -> Option<String> {
    let cleaned = marker.replace(line, "");
    let cleaned = cleaned.trim();
    (char_len(cleaned) > min_len).then(|| cleaned.to_string())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn tokens(line: &str) -> impl Iterator<Item = String> + '_ {
    line.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// `token` is `stem` or a simple English inflection of it
/// ("cups", "stirred", "baking", "mixes").
fn inflection_of(token: &str, stem: &str) -> bool {
    if stem.is_empty() {
        return false;
    }
    if let Some(rest) = token.strip_prefix(stem) {
        if matches!(rest, "" | "s" | "es" | "d" | "ed" | "ing") {
            return true;
        }
        // doubled final consonant: stirring, stirred
        if let Some(last) = stem.chars().last() {
            if let Some(tail) = rest.strip_prefix(last) {
                return matches!(tail, "ed" | "ing");
            }
        }
        return false;
    }
    // dropped final e: baking, combining
    stem.strip_suffix('e')
        .and_then(|base| token.strip_prefix(base))
        .is_some_and(|rest| rest == "ing")
}
