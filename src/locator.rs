//! Ordered fallback chains of element locators.

use log::debug;

use crate::browser::{BrowserDriver, DriverError, ElementSnapshot, Locator};

/// How many matched elements a step reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Only the first matched element
    Single,
    /// Every matched element, in document order
    List,
}

/// What to read off a matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Read {
    Text,
    Attribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorStep {
    pub locator: Locator,
    pub cardinality: Cardinality,
    pub read: Read,
    /// When non-empty, a value must contain one of these (case-insensitive)
    pub must_contain: Vec<String>,
}

impl LocatorStep {
    pub fn new(locator: Locator, cardinality: Cardinality, read: Read) -> Self {
        Self {
            locator,
            cardinality,
            read,
            must_contain: Vec::new(),
        }
    }

    /// Text of the first element matching `selector`.
    pub fn text(selector: &str) -> Self {
        Self::new(Locator::css(selector), Cardinality::Single, Read::Text)
    }

    /// Text of every element matching `selector`.
    pub fn list(selector: &str) -> Self {
        Self::new(Locator::css(selector), Cardinality::List, Read::Text)
    }

    /// An attribute of the first element matching `selector`.
    pub fn attribute(selector: &str, name: &str) -> Self {
        Self::new(
            Locator::css(selector),
            Cardinality::Single,
            Read::Attribute(name.to_string()),
        )
    }

    /// Text of every `item_tag` in the section introduced by a heading.
    pub fn under_heading(heading_text: &str, item_tag: &str) -> Self {
        Self::new(
            Locator::under_heading(heading_text, item_tag),
            Cardinality::List,
            Read::Text,
        )
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn containing(mut self, needles: &[&str]) -> Self {
        self.must_contain = needles.iter().map(|needle| needle.to_lowercase()).collect();
        self
    }

    fn read_value(&self, element: &ElementSnapshot) -> Option<String> {
        match &self.read {
            Read::Text => Some(element.text.trim().to_string()),
            Read::Attribute(name) => element.attribute(name).map(|value| value.trim().to_string()),
        }
    }

    fn accepts(&self, value: &str, min_length: usize) -> bool {
        if value.chars().count() <= min_length {
            return false;
        }
        if self.must_contain.is_empty() {
            return true;
        }
        let lowered = value.to_lowercase();
        self.must_contain.iter().any(|needle| lowered.contains(needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorChain {
    steps: Vec<LocatorStep>,
}

impl LocatorChain {
    pub fn new(steps: Vec<LocatorStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[LocatorStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl FromIterator<LocatorStep> for LocatorChain {
    fn from_iter<I: IntoIterator<Item = LocatorStep>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// The accepted result of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    One(String),
    Many(Vec<String>),
}

impl Located {
    /// First value.
    pub fn into_first(self) -> String {
        match self {
            Located::One(value) => value,
            Located::Many(values) => values.into_iter().next().unwrap_or_default(),
        }
    }

    pub fn into_items(self) -> Vec<String> {
        match self {
            Located::One(value) => vec![value],
            Located::Many(values) => values,
        }
    }

    pub fn joined(self, separator: &str) -> String {
        self.into_items().join(separator)
    }
}

/// Try each step in order and return the first acceptable result.
///
/// A value is acceptable when its trimmed length exceeds `min_length` (and it
/// passes the step's `must_contain` filter). Steps after the accepted one are
/// never evaluated. A step whose lookup fails is skipped; an exhausted chain
/// is a soft miss (`Ok(None)`). Only a lost browser session is an error.
pub fn locate(
    driver: &dyn BrowserDriver,
    chain: &LocatorChain,
    min_length: usize,
) -> Result<Option<Located>, DriverError> {
    for step in chain.steps() {
        let elements = match driver.find_elements(&step.locator) {
            Ok(elements) => elements,
            Err(err) if err.is_session_lost() => return Err(err),
            Err(err) => {
                debug!("Locator {} missed: {}", step.locator, err);
                continue;
            }
        };

        let candidates = match step.cardinality {
            Cardinality::Single => &elements[..elements.len().min(1)],
            Cardinality::List => &elements[..],
        };
        let mut values: Vec<String> = candidates
            .iter()
            .filter_map(|element| step.read_value(element))
            .filter(|value| step.accepts(value, min_length))
            .collect();

        if values.is_empty() {
            debug!("Locator {} matched nothing usable", step.locator);
            continue;
        }

        debug!("Locator {} accepted {} value(s)", step.locator, values.len());
        return Ok(Some(match step.cardinality {
            Cardinality::Single => Located::One(values.swap_remove(0)),
            Cardinality::List => Located::Many(values),
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned elements per selector and records every lookup.
    #[derive(Default)]
    struct ScriptedDriver {
        elements: HashMap<String, Vec<ElementSnapshot>>,
        lookups: RefCell<Vec<String>>,
        disconnected: bool,
    }

    impl ScriptedDriver {
        fn with(mut self, selector: &str, elements: Vec<ElementSnapshot>) -> Self {
            self.elements.insert(selector.to_string(), elements);
            self
        }

        fn lookups(&self) -> Vec<String> {
            self.lookups.borrow().clone()
        }
    }

    impl BrowserDriver for ScriptedDriver {
        fn navigate(&mut self, _url: &str) -> Result<(), DriverError> {
            Ok(())
        }

        fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementSnapshot>, DriverError> {
            let Locator::Css(selector) = locator else {
                return Err(DriverError::NotFound(locator.to_string()));
            };
            self.lookups.borrow_mut().push(selector.clone());
            if self.disconnected {
                return Err(DriverError::Disconnected("target crashed".to_string()));
            }
            self.elements
                .get(selector)
                .cloned()
                .ok_or_else(|| DriverError::NotFound(locator.to_string()))
        }

        fn page_source(&self) -> Result<String, DriverError> {
            Ok(String::new())
        }

        fn execute_script(&mut self, _script: &str) -> Result<(), DriverError> {
            Ok(())
        }

        fn quit(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    fn text(tag: &str, value: &str) -> ElementSnapshot {
        ElementSnapshot::new(tag, value)
    }

    #[test]
    fn test_first_acceptable_step_wins_and_stops_the_chain() {
        let driver = ScriptedDriver::default()
            .with("h1.title", vec![text("h1", "Pasta Night")])
            .with("h1", vec![text("h1", "Something else")]);
        let chain = LocatorChain::new(vec![
            LocatorStep::text("h1.missing"),
            LocatorStep::text("h1.title"),
            LocatorStep::text("h1"),
        ]);

        let located = locate(&driver, &chain, 0).unwrap();

        assert_eq!(located, Some(Located::One("Pasta Night".to_string())));
        assert_eq!(driver.lookups(), vec!["h1.missing", "h1.title"]);
    }

    #[test]
    fn test_short_values_advance_to_next_step() {
        let driver = ScriptedDriver::default()
            .with("li.a", vec![text("li", "ok"), text("li", "  ")])
            .with("li.b", vec![text("li", "2 cups flour"), text("li", "x"), text("li", "1 egg")]);
        let chain = LocatorChain::new(vec![LocatorStep::list("li.a"), LocatorStep::list("li.b")]);

        let located = locate(&driver, &chain, 2).unwrap();

        assert_eq!(
            located,
            Some(Located::Many(vec!["2 cups flour".to_string(), "1 egg".to_string()]))
        );
    }

    #[test]
    fn test_single_reads_only_the_first_element() {
        let driver = ScriptedDriver::default()
            .with("h1", vec![text("h1", ""), text("h1", "Second heading")]);
        let chain = LocatorChain::new(vec![LocatorStep::text("h1")]);

        assert_eq!(locate(&driver, &chain, 0).unwrap(), None);
    }

    #[test]
    fn test_attribute_read_with_filter() {
        let driver = ScriptedDriver::default().with(
            "img",
            vec![
                text("img", "").with_attribute("src", "https://cdn.test/logo.png"),
                text("img", "").with_attribute("src", "https://static.nytimes.com/dish.jpg"),
            ],
        );
        let chain = LocatorChain::new(vec![LocatorStep::attribute("img", "src")
            .with_cardinality(Cardinality::List)
            .containing(&["nytimes", "recipe"])]);

        let located = locate(&driver, &chain, 0).unwrap().map(Located::into_first);

        assert_eq!(located.as_deref(), Some("https://static.nytimes.com/dish.jpg"));
    }

    #[test]
    fn test_exhausted_chain_is_a_soft_miss() {
        let driver = ScriptedDriver::default();
        let chain = LocatorChain::new(vec![LocatorStep::text("a"), LocatorStep::text("b")]);

        assert_eq!(locate(&driver, &chain, 0).unwrap(), None);
        assert_eq!(driver.lookups(), vec!["a", "b"]);
    }

    #[test]
    fn test_lost_session_ends_the_chain_with_an_error() {
        let driver = ScriptedDriver {
            disconnected: true,
            ..Default::default()
        };
        let chain = LocatorChain::new(vec![LocatorStep::text("a"), LocatorStep::text("b")]);

        let result = locate(&driver, &chain, 0);

        assert!(matches!(result, Err(DriverError::Disconnected(_))));
        assert_eq!(driver.lookups(), vec!["a"]);
    }

    #[test]
    fn test_located_conversions() {
        let many = Located::Many(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(many.clone().joined("\n\n"), "a\n\nb");
        assert_eq!(many.into_first(), "a");
        assert_eq!(Located::One("x".to_string()).into_items(), vec!["x"]);
    }
}
