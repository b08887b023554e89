use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::options::PickerOptions;

/// One candidate that survives the current query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub index: usize,
    pub score: i64,
    /// Character positions in the displayed text that matched the query.
    pub positions: Vec<usize>,
}

/// Candidate buffer plus query and cursor, independent of any terminal.
pub struct PickerState {
    lines: Vec<String>,
    delimiter: String,
    with_nth: Option<usize>,
    query: String,
    matches: Vec<Match>,
    cursor: usize,
    input_closed: bool,
    matcher: SkimMatcherV2,
}

impl PickerState {
    pub fn new(options: &PickerOptions) -> Self {
        Self {
            lines: Vec::new(),
            delimiter: options.delimiter.clone(),
            with_nth: options.with_nth,
            query: options.query.clone(),
            matches: Vec::new(),
            cursor: 0,
            input_closed: false,
            matcher: SkimMatcherV2::default(),
        }
    }

    pub fn extend<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.lines.len();
        self.lines.extend(lines);
        if self.lines.len() != before {
            self.refilter();
        }
    }

    pub fn close_input(&mut self) {
        self.input_closed = true;
    }

    pub fn input_closed(&self) -> bool {
        self.input_closed
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn push_char(&mut self, ch: char) {
        self.query.push(ch);
        self.refilter();
    }

    pub fn pop_char(&mut self) {
        if self.query.pop().is_some() {
            self.refilter();
        }
    }

    pub fn clear_query(&mut self) {
        if !self.query.is_empty() {
            self.query.clear();
            self.refilter();
        }
    }

    pub fn total(&self) -> usize {
        self.lines.len()
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Position of the cursor within `matches()`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn select_next(&mut self) {
        if self.cursor + 1 < self.matches.len() {
            self.cursor += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn selected_line(&self) -> Option<&str> {
        self.matches
            .get(self.cursor)
            .map(|matched| self.lines[matched.index].as_str())
    }

    /// Text shown (and matched) for the line at `index`.
    pub fn display(&self, index: usize) -> &str {
        display_text(&self.lines[index], &self.delimiter, self.with_nth)
    }

    fn refilter(&mut self) {
        let previous = self.matches.get(self.cursor).map(|matched| matched.index);
        let terms: Vec<&str> = self.query.split_whitespace().collect();

        let mut matches: Vec<Match> = (0..self.lines.len())
            .filter_map(|index| {
                let text = display_text(&self.lines[index], &self.delimiter, self.with_nth);
                score_terms(&self.matcher, text, &terms).map(|(score, positions)| Match {
                    index,
                    score,
                    positions,
                })
            })
            .collect();

        if !terms.is_empty() {
            // Stable: equal scores keep input order.
            matches.sort_by(|left, right| right.score.cmp(&left.score));
        }

        self.cursor = previous
            .and_then(|index| matches.iter().position(|matched| matched.index == index))
            .filter(|_| terms.is_empty())
            .unwrap_or(0);
        self.matches = matches;
    }
}

fn score_terms(matcher: &SkimMatcherV2, text: &str, terms: &[&str]) -> Option<(i64, Vec<usize>)> {
    let mut total = 0;
    let mut positions = Vec::new();

    for term in terms {
        let (score, indices) = matcher.fuzzy_indices(text, term)?;
        total += score;
        positions.extend(indices);
    }

    positions.sort_unstable();
    positions.dedup();
    Some((total, positions))
}

/// Returns the 1-based `n`-th field of `line` split on `delimiter`.
pub fn field<'a>(line: &'a str, delimiter: &str, n: usize) -> Option<&'a str> {
    line.split(delimiter).nth(n.checked_sub(1)?)
}

fn display_text<'a>(line: &'a str, delimiter: &str, with_nth: Option<usize>) -> &'a str {
    with_nth
        .and_then(|n| field(line, delimiter, n))
        .unwrap_or(line)
}
