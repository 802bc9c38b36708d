//! `dumpdmrouteinfo` response parser
//!
//! The dump is a banner line followed by one section per card:
//!
//! ```text
//! DM Routing Information for all Output cards
//! Routing Information for Input Card at Slot 1
//! ...
//! Routing Information for Output Card at Slot 33
//! Video Routed From Input Card at slot 5
//! Audio Routed From Input Card at slot 5
//!
//! ```
//!
//! Input card sections are skipped. Output card sections record where video
//! and audio come from; an output only resolves to an input when both agree.
//! A blank line ends the dump.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::ParseError;

/// Prefix shared by every section header
pub const SECTION_PREFIX: &str = "Routing Information";

/// Header of an input card section (skipped)
pub const INPUT_SECTION_PREFIX: &str = "Routing Information for Input Card at Slot ";

/// Header of an output card section; the suffix is the output slot
pub const OUTPUT_SECTION_PREFIX: &str = "Routing Information for Output Card at Slot ";

/// Video source line inside an output section
pub const VIDEO_SOURCE_PREFIX: &str = "Video Routed From Input Card at slot ";

/// Audio source line inside an output section
pub const AUDIO_SOURCE_PREFIX: &str = "Audio Routed From Input Card at slot ";

/// Sources feeding one output card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputRoute {
    /// Output slot as reported by the dump
    pub output_slot: String,
    /// Input slot feeding video, empty when not reported
    pub video_source: String,
    /// Input slot feeding audio, empty when not reported
    pub audio_source: String,
}

impl OutputRoute {
    /// Create a route for `output_slot` with no known sources
    pub fn new(output_slot: impl Into<String>) -> Self {
        Self {
            output_slot: output_slot.into(),
            video_source: String::new(),
            audio_source: String::new(),
        }
    }

    /// The input feeding both audio and video, or `""` when they differ
    pub fn resolved_input(&self) -> &str {
        if self.video_source == self.audio_source {
            &self.video_source
        } else {
            ""
        }
    }

    /// Whether audio and video come from different inputs
    pub fn is_split(&self) -> bool {
        self.video_source != self.audio_source
    }
}

/// Output slot to input mapping for the whole switch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteTable {
    outputs: HashMap<String, OutputRoute>,
}

impl RouteTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved input for an output slot
    ///
    /// Returns `Some("")` for outputs whose audio and video disagree.
    pub fn get(&self, output_slot: &str) -> Option<&str> {
        self.outputs.get(output_slot).map(OutputRoute::resolved_input)
    }

    /// Full audio/video detail for an output slot
    pub fn route(&self, output_slot: &str) -> Option<&OutputRoute> {
        self.outputs.get(output_slot)
    }

    /// Insert or replace the route for its output slot
    pub fn insert(&mut self, route: OutputRoute) {
        self.outputs.insert(route.output_slot.clone(), route);
    }

    /// Number of outputs in the table
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether the table has no outputs
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Iterate `(output slot, resolved input)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outputs
            .iter()
            .map(|(slot, route)| (slot.as_str(), route.resolved_input()))
    }

    /// Routes ordered by numeric slot, non-numeric slots last
    pub fn sorted_routes(&self) -> Vec<&OutputRoute> {
        let mut routes: Vec<&OutputRoute> = self.outputs.values().collect();
        routes.sort_by(|a, b| {
            let ka = (a.output_slot.parse::<i64>().unwrap_or(i64::MAX), &a.output_slot);
            let kb = (b.output_slot.parse::<i64>().unwrap_or(i64::MAX), &b.output_slot);
            ka.cmp(&kb)
        });
        routes
    }

    /// Plain `output -> input` map
    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(slot, input)| (slot.to_string(), input.to_string()))
            .collect()
    }
}

impl FromIterator<OutputRoute> for RouteTable {
    fn from_iter<I: IntoIterator<Item = OutputRoute>>(iter: I) -> Self {
        let mut table = RouteTable::new();
        for route in iter {
            table.insert(route);
        }
        table
    }
}

/// Parse the text of a `dumpdmrouteinfo` response
///
/// The first line is the banner and is skipped without inspection. On
/// [`ParseError::UnexpectedLine`] the routes resolved so far travel with the
/// error.
pub fn parse_route_dump(text: &str) -> Result<RouteTable, ParseError> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    if lines.is_empty() {
        return Err(ParseError::Empty);
    }

    let table = RouteDumpParser::new(&lines).run()?;
    debug!("Parsed {} output routes", table.len());
    Ok(table)
}

/// Scanner states
#[derive(Debug)]
enum State {
    /// Looking at a section header, a blank line, or garbage
    Scanning,
    /// Inside an input card section
    SkipInputSection,
    /// Inside an output card section
    AccumulateOutputSection(OutputRoute),
    /// Blank line or end of input reached
    Done,
}

struct RouteDumpParser<'a> {
    lines: &'a [&'a str],
    cursor: usize,
    table: RouteTable,
}

impl<'a> RouteDumpParser<'a> {
    fn new(lines: &'a [&'a str]) -> Self {
        Self {
            lines,
            // line 0 is the banner
            cursor: 1,
            table: RouteTable::new(),
        }
    }

    fn current(&self) -> Option<&'a str> {
        self.lines.get(self.cursor).copied()
    }

    fn run(mut self) -> Result<RouteTable, ParseError> {
        let mut state = State::Scanning;
        loop {
            state = match state {
                State::Scanning => self.scan()?,
                State::SkipInputSection => {
                    self.skip_section();
                    State::Scanning
                }
                State::AccumulateOutputSection(route) => {
                    self.accumulate(route);
                    State::Scanning
                }
                State::Done => return Ok(self.table),
            };
        }
    }

    fn scan(&mut self) -> Result<State, ParseError> {
        let Some(line) = self.current() else {
            return Ok(State::Done);
        };

        if line.starts_with(INPUT_SECTION_PREFIX) {
            Ok(State::SkipInputSection)
        } else if let Some(slot) = line.strip_prefix(OUTPUT_SECTION_PREFIX) {
            Ok(State::AccumulateOutputSection(OutputRoute::new(slot)))
        } else if line.is_empty() {
            Ok(State::Done)
        } else {
            Err(ParseError::UnexpectedLine {
                line: line.to_string(),
                partial: std::mem::take(&mut self.table),
            })
        }
    }

    /// Move the cursor from a section header to the next section boundary
    fn advance_in_section(&mut self) -> Option<&'a str> {
        self.cursor += 1;
        self.current().filter(|line| !is_boundary(line))
    }

    fn skip_section(&mut self) {
        trace!("Skipping input section at line {}", self.cursor);
        while self.advance_in_section().is_some() {}
    }

    fn accumulate(&mut self, mut route: OutputRoute) {
        while let Some(line) = self.advance_in_section() {
            if let Some(video) = line.strip_prefix(VIDEO_SOURCE_PREFIX) {
                route.video_source = video.to_string();
            } else if let Some(audio) = line.strip_prefix(AUDIO_SOURCE_PREFIX) {
                route.audio_source = audio.to_string();
            }
        }

        trace!(
            "Output {}: video={:?} audio={:?}",
            route.output_slot,
            route.video_source,
            route.audio_source
        );
        self.table.insert(route);
    }
}

fn is_boundary(line: &str) -> bool {
    line.is_empty() || line.starts_with(SECTION_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANNER: &str = "DM Routing Information for all Output cards";

    fn dump(lines: &[&str]) -> String {
        let mut text = String::from(BANNER);
        for line in lines {
            text.push_str("\r\n");
            text.push_str(line);
        }
        text
    }

    #[test]
    fn test_single_output_resolved() {
        let text = dump(&[
            "Routing Information for Output Card at Slot 33",
            "Video Routed From Input Card at slot 5",
            "Audio Routed From Input Card at slot 5",
            "",
        ]);

        let table = parse_route_dump(&text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("33"), Some("5"));
    }

    #[test]
    fn test_input_section_skipped() {
        let text = "DM Routing Information for all Output cards\n\
                    Routing Information for Input Card at Slot 1\n\
                    Routing Information for Output Card at Slot 33\n\
                    Video Routed From Input Card at slot 5\n\
                    Audio Routed From Input Card at slot 5\n\
                    \n";

        let table = parse_route_dump(text).unwrap();
        assert_eq!(
            table.to_map(),
            HashMap::from([("33".to_string(), "5".to_string())])
        );
    }

    #[test]
    fn test_input_section_body_skipped() {
        let text = dump(&[
            "Routing Information for Input Card at Slot 1",
            "Video Routed To Output Card at slot 33",
            "Some other detail the parser does not know",
            "Routing Information for Output Card at Slot 33",
            "Video Routed From Input Card at slot 1",
            "Audio Routed From Input Card at slot 1",
        ]);

        let table = parse_route_dump(&text).unwrap();
        assert_eq!(table.get("33"), Some("1"));
    }

    #[test]
    fn test_split_route_is_empty() {
        let text = dump(&[
            "Routing Information for Output Card at Slot 33",
            "Video Routed From Input Card at slot 5",
            "Audio Routed From Input Card at slot 6",
            "",
        ]);

        let table = parse_route_dump(&text).unwrap();
        assert_eq!(table.get("33"), Some(""));
        let route = table.route("33").unwrap();
        assert!(route.is_split());
        assert_eq!(route.video_source, "5");
        assert_eq!(route.audio_source, "6");
    }

    #[test]
    fn test_missing_audio_is_empty() {
        let text = dump(&[
            "Routing Information for Output Card at Slot 33",
            "Video Routed From Input Card at slot 5",
            "",
        ]);

        let table = parse_route_dump(&text).unwrap();
        assert_eq!(table.get("33"), Some(""));
    }

    #[test]
    fn test_section_without_sources_is_empty() {
        let text = dump(&[
            "Routing Information for Output Card at Slot 33",
            "Routing Information for Output Card at Slot 34",
            "Video Routed From Input Card at slot 2",
            "Audio Routed From Input Card at slot 2",
        ]);

        let table = parse_route_dump(&text).unwrap();
        assert_eq!(table.get("33"), Some(""));
        assert_eq!(table.get("34"), Some("2"));
    }

    #[test]
    fn test_later_source_line_overwrites() {
        let text = dump(&[
            "Routing Information for Output Card at Slot 33",
            "Video Routed From Input Card at slot 1",
            "Video Routed From Input Card at slot 3",
            "Audio Routed From Input Card at slot 3",
        ]);

        let table = parse_route_dump(&text).unwrap();
        assert_eq!(table.get("33"), Some("3"));
    }

    #[test]
    fn test_blank_line_stops_scanning() {
        let text = dump(&[
            "Routing Information for Output Card at Slot 33",
            "Video Routed From Input Card at slot 5",
            "Audio Routed From Input Card at slot 5",
            "",
            "Routing Information for Output Card at Slot 34",
            "Video Routed From Input Card at slot 6",
            "Audio Routed From Input Card at slot 6",
            "garbage that would otherwise fail",
        ]);

        let table = parse_route_dump(&text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("34"), None);
    }

    #[test]
    fn test_trailing_prompt_name_after_blank_line_ignored() {
        let text = dump(&[
            "Routing Information for Output Card at Slot 33",
            "Video Routed From Input Card at slot 5",
            "Audio Routed From Input Card at slot 5",
            "",
            "DM-MD8X8",
        ]);

        assert_eq!(parse_route_dump(&text).unwrap().get("33"), Some("5"));
    }

    #[test]
    fn test_unexpected_line_keeps_partial_table() {
        let text = dump(&[
            "Routing Information for Output Card at Slot 33",
            "Video Routed From Input Card at slot 5",
            "Audio Routed From Input Card at slot 5",
            "Routing Information for Output Card at Slot 34",
            "Video Routed From Input Card at slot 2",
            "Audio Routed From Input Card at slot 3",
            "Routing Information for Transmitter at Slot 9",
            "Routing Information for Output Card at Slot 35",
        ]);

        let err = parse_route_dump(&text).unwrap_err();
        match &err {
            ParseError::UnexpectedLine { line, partial } => {
                assert_eq!(line, "Routing Information for Transmitter at Slot 9");
                assert_eq!(partial.get("33"), Some("5"));
                assert_eq!(partial.get("34"), Some(""));
                assert_eq!(partial.get("35"), None);
            }
            other => panic!("expected UnexpectedLine, got {:?}", other),
        }
        assert_eq!(err.partial().map(RouteTable::len), Some(2));
    }

    #[test]
    fn test_unrecognized_lines_inside_output_section_ignored() {
        let text = dump(&[
            "Routing Information for Output Card at Slot 33",
            "Output Card Type: DMC-HD",
            "Video Routed From Input Card at slot 5",
            "Audio Routed From Input Card at slot 5",
        ]);

        assert_eq!(parse_route_dump(&text).unwrap().get("33"), Some("5"));
    }

    #[test]
    fn test_unexpected_line_before_any_section() {
        let text = dump(&["Video Routed From Input Card at slot 5"]);

        let err = parse_route_dump(&text).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedLine { ref partial, .. } if partial.is_empty()
        ));
    }

    #[test]
    fn test_unknown_section_header_is_unexpected() {
        let text = dump(&["Routing Information for Transmitter at Slot 9"]);
        assert!(matches!(
            parse_route_dump(&text),
            Err(ParseError::UnexpectedLine { .. })
        ));
    }

    #[test]
    fn test_empty_response() {
        assert_eq!(parse_route_dump(""), Err(ParseError::Empty));
    }

    #[test]
    fn test_banner_only() {
        let table = parse_route_dump(BANNER).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_banner_not_validated() {
        let text = "anything at all\n\
                    Routing Information for Output Card at Slot 40\n\
                    Video Routed From Input Card at slot 8\n\
                    Audio Routed From Input Card at slot 8";

        assert_eq!(parse_route_dump(text).unwrap().get("40"), Some("8"));
    }

    #[test]
    fn test_lines_are_trimmed() {
        let text = "banner\n\
                    \t Routing Information for Output Card at Slot 33  \n\
                    \x20\x20Video Routed From Input Card at slot 5 \n\
                    \x20\x20Audio Routed From Input Card at slot 5\t\n";

        assert_eq!(parse_route_dump(text).unwrap().get("33"), Some("5"));
    }

    #[test]
    fn test_sorted_routes_numeric_order() {
        let table: RouteTable = ["40", "9", "33", "x"]
            .into_iter()
            .map(OutputRoute::new)
            .collect();

        let slots: Vec<&str> = table
            .sorted_routes()
            .into_iter()
            .map(|r| r.output_slot.as_str())
            .collect();
        assert_eq!(slots, vec!["9", "33", "40", "x"]);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn source() -> impl Strategy<Value = Option<u8>> {
            prop_oneof![Just(None), (1u8..=4).prop_map(Some)]
        }

        proptest! {
            #[test]
            fn resolved_only_when_sources_agree(
                sections in prop::collection::btree_map(33u16..64, (source(), source()), 0..8)
            ) {
                let mut text = String::from(BANNER);
                for (slot, (video, audio)) in &sections {
                    text.push_str(&format!("\n{}{}", OUTPUT_SECTION_PREFIX, slot));
                    if let Some(v) = video {
                        text.push_str(&format!("\n{}{}", VIDEO_SOURCE_PREFIX, v));
                    }
                    if let Some(a) = audio {
                        text.push_str(&format!("\n{}{}", AUDIO_SOURCE_PREFIX, a));
                    }
                }
                text.push('\n');

                let table = parse_route_dump(&text).unwrap();
                prop_assert_eq!(table.len(), sections.len());
                for (slot, (video, audio)) in &sections {
                    let expected = if video == audio {
                        video.map(|v| v.to_string()).unwrap_or_default()
                    } else {
                        String::new()
                    };
                    prop_assert_eq!(table.get(&slot.to_string()), Some(expected.as_str()));
                }
            }
        }
    }
}
