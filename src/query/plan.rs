//! Query plan construction and execution.

use super::compare::{compare_bound, compare_values};
use super::fold::fold;
use super::params::QueryParams;
use super::pattern::WildcardPattern;
use crate::error::{Result, StoreError};
use crate::schema::{FieldSchema, FieldType};
use crate::types::Record;
use serde_json::Value;
use std::cmp::Ordering;

const START_SUFFIX: &str = ".start";
const END_SUFFIX: &str = ".end";

/// One key of a multi-key sort.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub ascending: bool,
}

/// Wildcard patterns a field must all match.
#[derive(Clone, Debug)]
pub struct Predicate {
    pub field: String,
    pub patterns: Vec<WildcardPattern>,
}

/// Inclusive bounds on a field.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeSpec {
    pub field: String,
    pub start: Value,
    pub end: Value,
}

impl RangeSpec {
    fn contains(&self, value: Option<&Value>) -> bool {
        compare_bound(Some(&self.start), value) != Ordering::Greater
            && compare_bound(value, Some(&self.end)) != Ordering::Greater
    }
}

/// Page `offset` of size `limit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

/// A validated query, ready to run over any record sequence of its schema.
#[derive(Clone, Debug, Default)]
pub struct QueryPlan {
    fields: Vec<String>,
    sort: Vec<SortKey>,
    predicates: Vec<Predicate>,
    keywords: Vec<String>,
    ranges: Vec<RangeSpec>,
    page: Option<Page>,
    text_fields: Vec<String>,
}

impl QueryPlan {
    /// Build a plan from raw parameters.
    ///
    /// Every problem is collected; if there is any, the whole plan is
    /// rejected with [`StoreError::InvalidQuery`].
    pub fn parse(params: &QueryParams, schema: &FieldSchema) -> Result<Self> {
        let mut builder = PlanBuilder::new(schema);
        for (key, values) in params.grouped() {
            builder.accept(key, &values);
        }
        builder.finish()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Keyword terms, already folded.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn ranges(&self) -> &[RangeSpec] {
        &self.ranges
    }

    pub fn page(&self) -> Option<Page> {
        self.page
    }

    /// Run the plan: predicates, keywords, projection, ranges, sort, page.
    pub fn execute(&self, records: Vec<Record>) -> Vec<Record> {
        let mut working: Vec<Record> = records
            .into_iter()
            .filter(|r| self.matches_predicates(r) && self.matches_keywords(r))
            .collect();

        if !self.fields.is_empty() {
            working = self.project(working);
        }

        if !self.ranges.is_empty() {
            working = self.filter_ranges(working);
        }

        if !self.sort.is_empty() {
            sort_records(&mut working, &self.sort);
        }

        match self.page {
            Some(Page { limit, offset }) => working
                .into_iter()
                .skip(offset.saturating_mul(limit))
                .take(limit)
                .collect(),
            None => working,
        }
    }

    fn matches_predicates(&self, record: &Record) -> bool {
        self.predicates.iter().all(|predicate| {
            record.get(&predicate.field).map_or(false, |value| {
                predicate.patterns.iter().all(|p| p.matches(value))
            })
        })
    }

    fn matches_keywords(&self, record: &Record) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let mut text = String::new();
        for field in &self.text_fields {
            if let Some(Value::String(s)) = record.get(field) {
                text.push_str(&fold(s));
                text.push(' ');
            }
        }
        self.keywords.iter().all(|k| text.contains(k.as_str()))
    }

    /// Keep only the selected fields, then drop duplicate rows.
    ///
    /// Duplicates are found by sorting on the selected fields; the caller's
    /// sort keys are applied later and are unaffected.
    fn project(&self, records: Vec<Record>) -> Vec<Record> {
        let mut reduced: Vec<Record> = records
            .iter()
            .map(|record| {
                let mut row = Record::new();
                for field in &self.fields {
                    if let Some(value) = record.get(field) {
                        row.insert(field.clone(), value.clone());
                    }
                }
                row
            })
            .collect();

        let keys: Vec<SortKey> = self
            .fields
            .iter()
            .map(|field| SortKey {
                field: field.clone(),
                ascending: true,
            })
            .collect();
        sort_records(&mut reduced, &keys);
        reduced.dedup_by(|a, b| self.fields.iter().all(|f| a.get(f) == b.get(f)));
        reduced
    }

    /// Union of the records inside each range, in declaration order.
    ///
    /// Each range re-sorts the working set by its own field before scanning
    /// it, so the output is grouped per range and ascending within a group.
    /// A record inside several ranges appears once, in the first group.
    fn filter_ranges(&self, records: Vec<Record>) -> Vec<Record> {
        let mut order: Vec<usize> = (0..records.len()).collect();
        let mut taken = vec![false; records.len()];
        let mut kept = Vec::new();

        for range in &self.ranges {
            order.sort_by(|&a, &b| {
                compare_values(records[a].get(&range.field), records[b].get(&range.field))
            });
            for &i in &order {
                if !taken[i] && range.contains(records[i].get(&range.field)) {
                    taken[i] = true;
                    kept.push(i);
                }
            }
        }

        let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();
        kept.into_iter().filter_map(|i| slots[i].take()).collect()
    }
}

/// Stable multi-key sort with the shared comparison rule.
pub fn sort_records(records: &mut [Record], keys: &[SortKey]) {
    records.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let ord = compare_values(a.get(&key.field), b.get(&key.field));
                if key.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

/// Accumulates directives and validation messages while parsing.
struct PlanBuilder<'a> {
    schema: &'a FieldSchema,
    plan: QueryPlan,
    fields_seen: bool,
    limit: Option<String>,
    offset: Option<String>,
    ranges: Vec<(String, Option<Value>, Option<Value>)>,
    errors: Vec<String>,
}

impl<'a> PlanBuilder<'a> {
    fn new(schema: &'a FieldSchema) -> Self {
        let text_fields = schema
            .fields()
            .iter()
            .filter(|f| f.field_type == FieldType::String)
            .map(|f| f.name.clone())
            .collect();
        Self {
            schema,
            plan: QueryPlan {
                text_fields,
                ..QueryPlan::default()
            },
            fields_seen: false,
            limit: None,
            offset: None,
            ranges: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn accept(&mut self, key: &str, values: &[&str]) {
        if values.iter().any(|v| v.trim().is_empty()) {
            self.errors
                .push(format!("{} parameter has an undefined value", key));
            return;
        }

        let single_valued = matches!(
            key,
            "sort" | "limit" | "offset" | "fields" | "select" | "keywords"
        ) || key.ends_with(START_SUFFIX)
            || key.ends_with(END_SUFFIX);
        if single_valued && values.len() > 1 {
            self.errors
                .push(format!("{} cannot be used more than once", key));
            return;
        }

        match key {
            "sort" => self.add_sort(values[0]),
            "limit" => self.limit = Some(values[0].to_string()),
            "offset" => self.offset = Some(values[0].to_string()),
            "fields" | "select" => self.set_fields(key, values[0]),
            "keywords" => {
                self.plan.keywords = values[0]
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(fold)
                    .collect();
            }
            _ => {
                if let Some(field) = key.strip_suffix(START_SUFFIX) {
                    self.add_range(field, Some(values[0]), None);
                } else if let Some(field) = key.strip_suffix(END_SUFFIX) {
                    self.add_range(field, None, Some(values[0]));
                } else {
                    self.add_predicate(key, values);
                }
            }
        }
    }

    /// Resolve a field name against the schema.
    ///
    /// Names are trimmed; a name that is not a member is retried with its
    /// first letter capitalized (`title` -> `Title`).
    fn resolve(&mut self, context: &str, name: &str) -> Option<String> {
        let name = name.trim();
        if self.schema.is_member(name) {
            return Some(name.to_string());
        }
        let capitalized = capitalize_first(name);
        if self.schema.is_member(&capitalized) {
            return Some(capitalized);
        }
        self.errors.push(format!(
            "{} : {} is not a member of {} or is an invalid parameter",
            context,
            name,
            self.schema.class_name()
        ));
        None
    }

    fn add_sort(&mut self, value: &str) {
        for part in value.split(',') {
            let part = part.trim();
            let (name, ascending) = match part.strip_prefix('-') {
                Some(rest) => (rest, false),
                None => (part, true),
            };
            if let Some(field) = self.resolve("sort param", name) {
                self.plan.sort.push(SortKey { field, ascending });
            }
        }
    }

    fn set_fields(&mut self, key: &str, value: &str) {
        if self.fields_seen {
            self.errors
                .push(format!("{} cannot be used more than once", key));
            return;
        }
        self.fields_seen = true;
        for name in value.split(',') {
            if let Some(field) = self.resolve("fields param", name) {
                if !self.plan.fields.contains(&field) {
                    self.plan.fields.push(field);
                }
            }
        }
    }

    fn add_predicate(&mut self, key: &str, values: &[&str]) {
        let Some(field) = self.resolve("search param", key) else {
            return;
        };
        let mut patterns = Vec::with_capacity(values.len());
        for value in values {
            match WildcardPattern::new(value) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => self
                    .errors
                    .push(format!("search param : invalid pattern {}: {}", value, e)),
            }
        }
        match self.plan.predicates.iter_mut().find(|p| p.field == field) {
            Some(existing) => existing.patterns.extend(patterns),
            None => self.plan.predicates.push(Predicate { field, patterns }),
        }
    }

    fn add_range(&mut self, name: &str, start: Option<&str>, end: Option<&str>) {
        let Some(field) = self.resolve("range param", name) else {
            return;
        };
        let start = start.map(|s| Value::String(s.trim().to_string()));
        let end = end.map(|s| Value::String(s.trim().to_string()));
        match self.ranges.iter_mut().find(|(f, _, _)| *f == field) {
            Some((_, s, e)) => {
                if start.is_some() {
                    *s = start;
                }
                if end.is_some() {
                    *e = end;
                }
            }
            None => self.ranges.push((field, start, end)),
        }
    }

    fn parse_count(&mut self, name: &str, raw: Option<&str>) -> Option<usize> {
        let raw = raw?;
        match raw.trim().parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.errors
                    .push(format!("{} parameter value must be an integer >= 0", name));
                None
            }
        }
    }

    fn finish(mut self) -> Result<QueryPlan> {
        let limit_raw = self.limit.take();
        let offset_raw = self.offset.take();
        let limit = self.parse_count("limit", limit_raw.as_deref());
        let offset = self.parse_count("offset", offset_raw.as_deref());
        match (&limit_raw, &offset_raw) {
            (Some(_), None) => self.errors.push(
                "You must specify an offset parameter when using limit parameter".to_string(),
            ),
            (None, Some(_)) => self.errors.push(
                "You must specify a limit parameter when using offset parameter".to_string(),
            ),
            _ => {}
        }
        if let (Some(limit), Some(offset)) = (limit, offset) {
            self.plan.page = Some(Page { limit, offset });
        }

        // A lone bound pins the other side to the same value.
        self.plan.ranges = self
            .ranges
            .into_iter()
            .filter_map(|(field, start, end)| {
                let start = start.or_else(|| end.clone())?;
                let end = end.unwrap_or_else(|| start.clone());
                Some(RangeSpec { field, start, end })
            })
            .collect();

        if self.errors.is_empty() {
            Ok(self.plan)
        } else {
            Err(StoreError::InvalidQuery(self.errors))
        }
    }
}

fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
