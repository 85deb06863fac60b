//! Date selectors.
//!
//! Expressions starting with `/` or `(` are read as XPath, everything else as CSS selector.
//! Supported XPath subset:
//!
//! - absolute `/step` and descendant `//step` location steps,
//! - name tests and `*`,
//! - predicates: `[3]`, `[last()]`, `[@attr]`, `[@attr="value"]`, `[contains(@attr, "value")]`,
//!   `[text()="value"]`, `[contains(text(), "value")]`,
//! - terminal `text()` and `@attr` steps,
//! - grouping with position: `(//span)[2]`.
//!
//! `text()` means the text nodes of the element itself, never text of nested elements.
//! Each step walks the document once: descendant bases of nested contexts are visited a single time.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use crate::{products::unexpected::ExtractError, utilities::normalize_whitespace};


/// Compiled date selector
#[derive(Debug)]
pub enum DateSelector {
    /// CSS selector
    Css(Selector),

    /// XPath subset expression
    XPath(XPath),
}


impl DateSelector {
    /// Compile a selector expression
    pub fn parse(expression: &str) -> Result<DateSelector, ExtractError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(ExtractError::NoSelector);
        }
        if expression.starts_with('/') || expression.starts_with('(') {
            XPath::parse(expression).map(DateSelector::XPath)
        } else {
            Selector::parse(expression)
                .map(DateSelector::Css)
                .map_err(|err| {
                    ExtractError::InvalidSelector(expression.to_string(), err.to_string())
                })
        }
    }


    /// Text of the first match, whitespace normalized. None when nothing or only blank text matched.
    pub fn first_text(&self, document: &Html) -> Option<String> {
        let text = match self {
            DateSelector::Css(selector) => {
                document
                    .select(selector)
                    .next()
                    .map(|element| element_text(&element))
            }
            DateSelector::XPath(xpath) => xpath.first_text(document),
        };
        text.filter(|text| !text.is_empty())
    }
}


fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}


#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Any,
    Name(String),
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Index(usize),
    Last,
}


impl Position {
    fn pick<T: Clone>(self, items: &[T]) -> Option<T> {
        match self {
            Position::Index(index) => items.get(index - 1).cloned(),
            Position::Last => items.last().cloned(),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Attribute(String),
    Text,
}


#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(Position),
    Exists(Operand),
    Equals(Operand, String),
    Contains(Operand, String),
}


#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}


#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Element,
    Text,
    Attribute(String),
}


/// Parsed XPath subset expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    steps: Vec<Step>,
    target: Target,
    group: Option<Position>,
}


#[derive(Clone, Copy)]
enum Context<'a> {
    Document(&'a Html),
    Element(ElementRef<'a>),
}


impl XPath {
    /// Parse expression
    pub fn parse(expression: &str) -> Result<XPath, ExtractError> {
        Parser::new(expression).parse()
    }


    /// Values selected by the expression, in document order
    fn values(&self, document: &Html) -> Vec<String> {
        let mut contexts = vec![Context::Document(document)];
        for step in &self.steps {
            let bases = match step.axis {
                Axis::Child => contexts,
                Axis::Descendant => self_and_descendants(&contexts),
            };
            let found = bases
                .into_iter()
                .flat_map(|base| filter_candidates(children_of(base), step))
                .collect::<Vec<ElementRef>>();
            contexts = in_document_order(document, found)
                .into_iter()
                .map(Context::Element)
                .collect();
        }
        let elements = contexts.into_iter().filter_map(|context| {
            match context {
                Context::Element(element) => Some(element),
                Context::Document(_) => None,
            }
        });
        match &self.target {
            Target::Element => elements.map(|element| element_text(&element)).collect(),
            Target::Text => {
                elements
                    .flat_map(|element| {
                        element
                            .children()
                            .filter_map(|child| child.value().as_text().map(|text| normalize_whitespace(text)))
                            .filter(|text| !text.is_empty())
                            .collect::<Vec<String>>()
                    })
                    .collect()
            }
            Target::Attribute(name) => {
                elements
                    .filter_map(|element| element.value().attr(name).map(normalize_whitespace))
                    .collect()
            }
        }
    }


    fn first_text(&self, document: &Html) -> Option<String> {
        let values = self.values(document);
        match self.group {
            Some(position) => position.pick(&values),
            None => values.into_iter().next(),
        }
    }
}


fn children_of(context: Context) -> Vec<ElementRef> {
    match context {
        Context::Document(document) => vec![document.root_element()],
        Context::Element(element) => element.children().filter_map(ElementRef::wrap).collect(),
    }
}


/// Self-or-descendant nodes of contexts given in document order, each node once
fn self_and_descendants<'a>(contexts: &[Context<'a>]) -> Vec<Context<'a>> {
    let mut covered = HashSet::new();
    let mut bases = Vec::new();
    for context in contexts {
        let root = match context {
            Context::Document(document) => {
                bases.push(*context);
                document.root_element()
            }
            Context::Element(element) => *element,
        };
        // nested context: its subtree is already there
        if covered.contains(&root.id()) {
            continue;
        }
        for element in root.descendants().filter_map(ElementRef::wrap) {
            covered.insert(element.id());
            bases.push(Context::Element(element));
        }
    }
    bases
}


fn filter_candidates<'a>(candidates: Vec<ElementRef<'a>>, step: &Step) -> Vec<ElementRef<'a>> {
    let mut selected = candidates
        .into_iter()
        .filter(|element| matches_test(element, &step.test))
        .collect::<Vec<ElementRef>>();
    for predicate in &step.predicates {
        selected = match predicate {
            Predicate::Position(position) => position.pick(&selected).into_iter().collect(),
            other => {
                selected
                    .into_iter()
                    .filter(|element| matches_predicate(element, other))
                    .collect()
            }
        };
    }
    selected
}


fn matches_test(element: &ElementRef, test: &NodeTest) -> bool {
    match test {
        NodeTest::Any => true,
        NodeTest::Name(name) => element.value().name().eq_ignore_ascii_case(name),
    }
}


fn operand_value(element: &ElementRef, operand: &Operand) -> Option<String> {
    match operand {
        Operand::Attribute(name) => element.value().attr(name).map(String::from),
        Operand::Text => Some(own_text(element)),
    }
}


fn own_text(element: &ElementRef) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .fold(String::new(), |mut own, text| {
            own.push_str(text);
            own
        })
}


fn matches_predicate(element: &ElementRef, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Position(_) => true,
        Predicate::Exists(operand) => {
            operand_value(element, operand).map_or(false, |value| {
                *operand != Operand::Text || !value.trim().is_empty()
            })
        }
        Predicate::Equals(operand, expected) => {
            operand_value(element, operand).map_or(false, |value| &value == expected)
        }
        Predicate::Contains(operand, expected) => {
            operand_value(element, operand).map_or(false, |value| value.contains(expected.as_str()))
        }
    }
}


/// Keep given elements once each, in document order
fn in_document_order<'a>(document: &'a Html, elements: Vec<ElementRef<'a>>) -> Vec<ElementRef<'a>> {
    let wanted = elements.iter().map(|element| element.id()).collect::<HashSet<_>>();
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| wanted.contains(&element.id()))
        .collect()
}


/// Hand written recursive descent parser of the XPath subset
struct Parser {
    expression: String,
    chars: Vec<char>,
    position: usize,
}


impl Parser {
    fn new(expression: &str) -> Parser {
        Parser {
            expression: expression.to_string(),
            chars: expression.chars().collect(),
            position: 0,
        }
    }


    fn error(&self, details: &str) -> ExtractError {
        ExtractError::InvalidSelector(
            self.expression.clone(),
            format!("{} at position {}", details, self.position),
        )
    }


    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }


    fn skip_spaces(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.position += 1;
        }
    }


    fn eat(&mut self, token: &str) -> bool {
        self.skip_spaces();
        let token = token.chars().collect::<Vec<char>>();
        let end = self.position + token.len();
        if end <= self.chars.len() && self.chars[self.position..end] == token[..] {
            self.position = end;
            true
        } else {
            false
        }
    }


    fn expect(&mut self, token: &str) -> Result<(), ExtractError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected \"{}\"", token)))
        }
    }


    fn parse(mut self) -> Result<XPath, ExtractError> {
        let xpath = if self.eat("(") {
            let mut inner = self.parse_path()?;
            self.expect(")")?;
            self.expect("[")?;
            inner.group = Some(self.parse_position()?);
            self.expect("]")?;
            inner
        } else {
            self.parse_path()?
        };
        self.skip_spaces();
        if self.position < self.chars.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(xpath)
    }


    fn parse_path(&mut self) -> Result<XPath, ExtractError> {
        let mut steps = Vec::new();
        loop {
            let axis = if self.eat("//") {
                Axis::Descendant
            } else if self.eat("/") {
                Axis::Child
            } else {
                break;
            };
            if self.eat("text()") {
                return self.finish(steps, Target::Text);
            }
            if self.eat("@") {
                let name = self.parse_name()?;
                return self.finish(steps, Target::Attribute(name));
            }
            let test = if self.eat("*") {
                NodeTest::Any
            } else {
                NodeTest::Name(self.parse_name()?)
            };
            let mut predicates = Vec::new();
            while self.eat("[") {
                predicates.push(self.parse_predicate()?);
                self.expect("]")?;
            }
            steps.push(Step {
                axis,
                test,
                predicates,
            });
        }
        if steps.is_empty() {
            return Err(self.error("expected location step"));
        }
        Ok(XPath {
            steps,
            target: Target::Element,
            group: None,
        })
    }


    fn finish(&mut self, steps: Vec<Step>, target: Target) -> Result<XPath, ExtractError> {
        if steps.is_empty() {
            return Err(self.error("text() or attribute step needs an element step before it"));
        }
        self.skip_spaces();
        if self.peek() == Some('/') {
            return Err(self.error("text() or attribute step has to be the last one"));
        }
        Ok(XPath {
            steps,
            target,
            group: None,
        })
    }


    fn parse_name(&mut self) -> Result<String, ExtractError> {
        self.skip_spaces();
        let start = self.position;
        while self
            .peek()
            .map_or(false, |c| c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        {
            self.position += 1;
        }
        if start == self.position {
            return Err(self.error("expected name"));
        }
        Ok(self.chars[start..self.position].iter().collect())
    }


    fn parse_position(&mut self) -> Result<Position, ExtractError> {
        if self.eat("last()") {
            return Ok(Position::Last);
        }
        self.skip_spaces();
        let start = self.position;
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.position += 1;
        }
        let digits = self.chars[start..self.position].iter().collect::<String>();
        match digits.parse::<usize>() {
            Ok(index) if index > 0 => Ok(Position::Index(index)),
            _ => Err(self.error("expected position greater than 0")),
        }
    }


    fn parse_operand(&mut self) -> Result<Operand, ExtractError> {
        if self.eat("@") {
            Ok(Operand::Attribute(self.parse_name()?))
        } else if self.eat("text()") {
            Ok(Operand::Text)
        } else {
            Err(self.error("expected @attribute or text()"))
        }
    }


    fn parse_literal(&mut self) -> Result<String, ExtractError> {
        self.skip_spaces();
        let quote = match self.peek() {
            Some(quote @ ('"' | '\'')) => quote,
            _ => return Err(self.error("expected quoted literal")),
        };
        self.position += 1;
        let start = self.position;
        while self.peek().map_or(false, |c| c != quote) {
            self.position += 1;
        }
        if self.peek().is_none() {
            return Err(self.error("unterminated literal"));
        }
        let literal = self.chars[start..self.position].iter().collect();
        self.position += 1;
        Ok(literal)
    }


    fn parse_predicate(&mut self) -> Result<Predicate, ExtractError> {
        if self.eat("contains(") {
            let operand = self.parse_operand()?;
            self.expect(",")?;
            let literal = self.parse_literal()?;
            self.expect(")")?;
            return Ok(Predicate::Contains(operand, literal));
        }
        self.skip_spaces();
        match self.peek() {
            Some('@') | Some('t') => {
                let operand = self.parse_operand()?;
                if self.eat("=") {
                    Ok(Predicate::Equals(operand, self.parse_literal()?))
                } else {
                    Ok(Predicate::Exists(operand))
                }
            }
            _ => self.parse_position().map(Predicate::Position),
        }
    }
}
