use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Category, FormFactor, Generation, PriceRecord, Snapshot};

struct CategoryRule {
    pattern: Regex,
    category: Category,
}

struct ProductRule {
    pattern: Regex,
    generation: Generation,
}

const CATEGORY_ORDER: [(FormFactor, Generation); 6] = [
    (FormFactor::Desktop, Generation::Ddr5),
    (FormFactor::Desktop, Generation::Ddr4),
    (FormFactor::Desktop, Generation::Ddr3),
    (FormFactor::Laptop, Generation::Ddr5),
    (FormFactor::Laptop, Generation::Ddr4),
    (FormFactor::Laptop, Generation::Ddr3),
];

// A marker needs a form-factor token and a generation token on the same line,
// in either order. Evaluated in order, first match wins.
static CATEGORY_RULES: LazyLock<Vec<CategoryRule>> = LazyLock::new(|| {
    CATEGORY_ORDER
        .iter()
        .map(|&(form_factor, generation)| {
            let ff = match form_factor {
                FormFactor::Desktop => "데스크[탑톱]",
                FormFactor::Laptop => "노트북",
            };
            let tag = generation.tag();
            CategoryRule {
                pattern: Regex::new(&format!(r"(?i){ff}\s*용?\s*{tag}|{tag}\s*{ff}"))
                    .expect("invalid regex: category marker"),
                category: Category::new(generation, form_factor),
            }
        })
        .collect()
});

// Capture groups: capacity, speed or part code, raw price. Evaluated in order,
// first match wins; the bare DDR4 rule only sees lines the PC4 rule rejected.
// Digits are ASCII only so every captured number converts with `str::parse`.
static PRODUCT_RULES: LazyLock<Vec<ProductRule>> = LazyLock::new(|| {
    [
        (
            r"(?i)삼성\s*D5\s*([0-9]+G)\s*[,\-]?\s*([0-9]{4,5})\s*(?:\[?[0-9]*\]?)?\s*-\s*([0-9,\.]+)\s*원",
            Generation::Ddr5,
        ),
        (
            r"(?i)삼성\s*([0-9]+G)\s*PC4[\s\-]*([0-9]{5})\s*(?:\[[0-9]+mhz\])?\s*-\s*([0-9,\.]+)\s*원",
            Generation::Ddr4,
        ),
        (
            r"(?i)삼성\s*([0-9]+G)\s*-?\s*([0-9]{5})\s*(?:\[[0-9]+mhz\])?\s*-\s*([0-9,\.]+)\s*원",
            Generation::Ddr4,
        ),
        (
            r"(?i)삼성\s*([0-9]+G)\s*PC3[\s\-]*([0-9]{5})\s*-?\s*([0-9,\.]+)\s*원",
            Generation::Ddr3,
        ),
    ]
    .into_iter()
    .map(|(pattern, generation)| ProductRule {
        pattern: Regex::new(pattern).expect("invalid regex: product line"),
        generation,
    })
    .collect()
});

/// State carried from one line to the next. Only category marker lines
/// change it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ParseState {
    category: Option<Category>,
    form_factor: FormFactor,
}

impl ParseState {
    fn advance(self, line: &str) -> Self {
        match detect_category(line) {
            Some(category) => {
                log::debug!("Category marker '{}' -> {}", line, category);
                Self {
                    category: Some(category),
                    form_factor: category.form_factor,
                }
            }
            None => self,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    Record(Category, PriceRecord),
    /// A product line seen before any category marker.
    Unattributed,
    NoMatch,
    /// The line matched a rule but a captured number did not convert.
    BadNumber(String),
}

/// Parses a free-text price listing into a snapshot of records per category.
///
/// Never fails: lines that match no rule, appear before the first category
/// marker, or carry unconvertible numbers are skipped. Within a category the
/// first occurrence of a product wins.
pub fn parse_listing(text: &str) -> Snapshot {
    let (_, snapshot) = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .fold(
            (ParseState::default(), Snapshot::new()),
            |(state, mut snapshot), line| {
                let state = state.advance(line);

                match extract_record(line, &state) {
                    LineOutcome::Record(category, record) => {
                        let records = snapshot.entry(category).or_default();
                        if records.iter().any(|r| r.product == record.product) {
                            log::debug!("Duplicate '{}' in {} skipped", record.product, category);
                        } else {
                            records.push(record);
                        }
                    }
                    LineOutcome::BadNumber(token) => {
                        log::debug!("Unconvertible number '{}' in line '{}'", token, line);
                    }
                    LineOutcome::Unattributed => {
                        log::debug!("Line before any category marker skipped: '{}'", line);
                    }
                    LineOutcome::NoMatch => {}
                }

                (state, snapshot)
            },
        );

    log::info!(
        "Parsed {} record(s) across {} categories",
        snapshot.values().map(Vec::len).sum::<usize>(),
        snapshot.len()
    );

    snapshot
}

fn detect_category(line: &str) -> Option<Category> {
    CATEGORY_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(line))
        .map(|rule| rule.category)
}

fn extract_record(line: &str, state: &ParseState) -> LineOutcome {
    let Some((rule, caps)) = PRODUCT_RULES
        .iter()
        .find_map(|rule| rule.pattern.captures(line).map(|caps| (rule, caps)))
    else {
        return LineOutcome::NoMatch;
    };

    let Some(category) = state.category else {
        return LineOutcome::Unattributed;
    };

    let capacity = caps[1].to_uppercase();
    if capacity.trim_end_matches('G').parse::<u32>().is_err() {
        return LineOutcome::BadNumber(capacity);
    }

    let Some(price) = normalize_price(&caps[3]) else {
        return LineOutcome::BadNumber(caps[3].to_string());
    };

    let product = format!(
        "삼성 {} {} {}{}",
        rule.generation.tag(),
        capacity,
        rule.generation.speed_label(&caps[2]),
        state.form_factor.product_suffix()
    );

    LineOutcome::Record(category, PriceRecord::new(product, price))
}

/// Converts a raw price token into whole won.
///
/// Commas are always thousands separators. A single dot followed by exactly
/// three digits is read as `.`-grouped thousands: the part before the dot is
/// multiplied by 1000. Otherwise every remaining dot is dropped and the
/// digits are read as one integer, so `52.00` becomes `5200`.
pub fn normalize_price(token: &str) -> Option<u64> {
    let cleaned: String = token.trim().chars().filter(|&c| c != ',').collect();

    if let Some((whole, fraction)) = cleaned.split_once('.')
        && fraction.len() == 3
        && fraction.chars().all(|c| c.is_ascii_digit())
    {
        return whole.parse::<u64>().ok()?.checked_mul(1000);
    }

    let digits: String = cleaned.chars().filter(|&c| c != '.').collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn desktop(generation: Generation) -> Category {
        Category::new(generation, FormFactor::Desktop)
    }

    fn laptop(generation: Generation) -> Category {
        Category::new(generation, FormFactor::Laptop)
    }

    fn products(snapshot: &Snapshot, category: Category) -> Vec<(&str, u64)> {
        snapshot
            .get(&category)
            .map(|records| {
                records
                    .iter()
                    .map(|r| (r.product.as_str(), r.price))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_normalize_price_comma_grouping() {
        assert_eq!(normalize_price("130,000"), Some(130_000));
        assert_eq!(normalize_price("1,300,000"), Some(1_300_000));
        assert_eq!(normalize_price("49000"), Some(49_000));
    }

    #[test]
    fn test_normalize_price_dot_grouping() {
        assert_eq!(normalize_price("130.000"), Some(130_000));
        assert_eq!(normalize_price("1,300.000"), Some(1_300_000));
        assert_eq!(normalize_price("1.300.000"), Some(1_300_000));
    }

    #[test]
    fn test_normalize_price_two_trailing_digits_is_not_thousands() {
        assert_eq!(normalize_price("52.00"), Some(5_200));
        assert_eq!(normalize_price("52.0"), Some(520));
    }

    #[test]
    fn test_normalize_price_rejects_garbage() {
        assert_eq!(normalize_price(",,"), None);
        assert_eq!(normalize_price("."), None);
        assert_eq!(normalize_price("99999999999999999999999"), None);
    }

    #[test]
    fn test_desktop_ddr4_scenario() {
        let snapshot = parse_listing("데스크탑 DDR4\n삼성 8G PC4-25600 - 49,000원");

        assert_eq!(snapshot.len(), 1);
        let records = &snapshot[&desktop(Generation::Ddr4)];
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0],
            PriceRecord {
                product: "삼성 DDR4 8G PC4-25600".to_string(),
                price: 49_000,
                price_formatted: "49,000원".to_string(),
            }
        );
    }

    #[test]
    fn test_price_line_before_category_is_dropped() {
        let snapshot = parse_listing("삼성 8G PC4-25600 - 49,000원\n데스크탑 DDR4");
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_first_occurrence_wins_within_category() {
        let text = "데스크탑 DDR4\n삼성 8G PC4-25600 - 49,000원\n삼성 8G PC4-25600 - 51,000원";
        let snapshot = parse_listing(text);

        assert_eq!(
            products(&snapshot, desktop(Generation::Ddr4)),
            vec![("삼성 DDR4 8G PC4-25600", 49_000)]
        );
    }

    #[test]
    fn test_same_product_in_different_categories_is_kept() {
        let text = "데스크탑 DDR4\n삼성 8G PC4-25600 - 49,000원\n\
                    노트북 DDR4\n삼성 8G PC4-25600 - 47,000원";
        let snapshot = parse_listing(text);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            products(&snapshot, laptop(Generation::Ddr4)),
            vec![("삼성 DDR4 8G PC4-25600 (노트북)", 47_000)]
        );
    }

    #[test]
    fn test_category_needs_form_factor_and_generation() {
        let text = "데스크탑 DDR4\n노트북 시세\nDDR5 신제품\n삼성 16G PC4-25600 - 35,000원";
        let snapshot = parse_listing(text);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            products(&snapshot, desktop(Generation::Ddr4)),
            vec![("삼성 DDR4 16G PC4-25600", 35_000)]
        );
    }

    #[test]
    fn test_category_tokens_in_either_order() {
        let snapshot = parse_listing("ddr3 노트북용\n삼성 4G PC3-12800 - 6,000원");

        assert_eq!(
            products(&snapshot, laptop(Generation::Ddr3)),
            vec![("삼성 DDR3 4G PC3-12800 (노트북)", 6_000)]
        );
    }

    #[test]
    fn test_first_matching_category_rule_wins() {
        let line = "데스크탑 DDR5 노트북 DDR4";
        assert_eq!(detect_category(line), Some(desktop(Generation::Ddr5)));

        let snapshot = parse_listing(&format!("{line}\n삼성 D5 16G 5600 - 62,000원"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            products(&snapshot, desktop(Generation::Ddr5)),
            vec![("삼성 DDR5 16G 5600MHz", 62_000)]
        );
    }

    #[test]
    fn test_pc4_rule_claims_line_before_bare_code_rule() {
        // Both DDR4 rules match this line, on different spans.
        let line = "삼성 8G PC4-25600 - 49,000원 / 삼성 16G 21300 - 30,000원";
        assert!(PRODUCT_RULES[1].pattern.is_match(line));
        assert!(PRODUCT_RULES[2].pattern.is_match(line));

        let state = ParseState::default().advance("데스크탑 DDR4");

        assert_eq!(
            extract_record(line, &state),
            LineOutcome::Record(
                desktop(Generation::Ddr4),
                PriceRecord::new("삼성 DDR4 8G PC4-25600", 49_000)
            )
        );
    }

    #[test]
    fn test_marker_line_can_carry_a_record() {
        let snapshot = parse_listing("데스크탑 DDR4 삼성 8G PC4-25600 - 49,000원");
        assert_eq!(
            products(&snapshot, desktop(Generation::Ddr4)),
            vec![("삼성 DDR4 8G PC4-25600", 49_000)]
        );
    }

    #[test]
    fn test_non_ascii_digits_skip_only_that_line() {
        let text = "데스크탑 DDR4\n삼성 ８G PC4-25600 - 49,000원\n\
                    삼성 16G PC4-25600 - ３５,000원\n삼성 32G PC4-25600 - 80,000원";
        let snapshot = parse_listing(text);

        assert_eq!(
            products(&snapshot, desktop(Generation::Ddr4)),
            vec![("삼성 DDR4 32G PC4-25600", 80_000)]
        );
    }

    #[test]
    fn test_extract_record_outcomes() {
        let idle = ParseState::default();
        assert_eq!(
            extract_record("삼성 8G PC4-25600 - 49,000원", &idle),
            LineOutcome::Unattributed
        );
        assert_eq!(extract_record("문의 주세요", &idle), LineOutcome::NoMatch);
        assert_eq!(
            extract_record("삼성 ８G PC4-25600 - 49,000원", &idle),
            LineOutcome::NoMatch
        );

        let active = idle.advance("노트북 DDR5");
        assert_eq!(active.form_factor, FormFactor::Laptop);
        assert_eq!(
            extract_record("삼성 D5 16G 5600 - ,,원", &active),
            LineOutcome::BadNumber(",,".to_string())
        );
    }

    #[test]
    fn test_parse_listing_from_fixture() {
        let text = fs::read_to_string("fixtures/listing.txt").expect("Failed to read fixture");

        let snapshot = parse_listing(&text);

        assert_eq!(snapshot.len(), 5);
        assert_eq!(
            products(&snapshot, desktop(Generation::Ddr5)),
            vec![
                ("삼성 DDR5 16G 5600MHz", 62_000),
                ("삼성 DDR5 32G 5600MHz", 118_000),
                ("삼성 DDR5 16G 4800MHz", 55_000),
            ]
        );
        assert_eq!(
            products(&snapshot, desktop(Generation::Ddr4)),
            vec![
                ("삼성 DDR4 8G PC4-25600", 19_000),
                ("삼성 DDR4 16G PC4-21300", 36_000),
                ("삼성 DDR4 32G PC4-25600", 70_000),
            ]
        );
        assert_eq!(
            products(&snapshot, desktop(Generation::Ddr3)),
            vec![
                ("삼성 DDR3 4G PC3-12800", 4_000),
                ("삼성 DDR3 8G PC3-12800", 8_000),
            ]
        );
        assert_eq!(
            products(&snapshot, laptop(Generation::Ddr4)),
            vec![
                ("삼성 DDR4 8G PC4-25600 (노트북)", 18_000),
                ("삼성 DDR4 16G PC4-25600 (노트북)", 35_000),
            ]
        );
        assert_eq!(
            products(&snapshot, laptop(Generation::Ddr5)),
            vec![("삼성 DDR5 16G 5600MHz (노트북)", 58_000)]
        );
    }

    #[test]
    fn test_snapshot_products_are_unique_per_category() {
        let text = fs::read_to_string("fixtures/listing.txt").expect("Failed to read fixture");
        let doubled = format!("{text}\n{text}");

        let snapshot = parse_listing(&doubled);

        for (category, records) in &snapshot {
            let mut names: Vec<_> = records.iter().map(|r| &r.product).collect();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), records.len(), "Duplicates in {}", category);
        }
    }
}
