//! Markup rule selection and final-price computation.
//!
//! Rules come from the destination CMS and are read-only for the duration of
//! a run. Selection is deterministic: a rule scoped to the product's section
//! beats an unscoped ("applies to all") rule, and within each class the
//! lowest `(sort, id)` wins. When nothing matches, an explicit per-prefix
//! default policy applies — never a silent zero.

/// A markup rule loaded from the destination system.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupRule {
    pub id: i64,
    pub name: String,
    /// `None` means the rule applies to every section.
    pub section_id: Option<i64>,
    /// Signed percent; negative values are discounts.
    pub percent: f64,
    /// Lower sort value = higher precedence.
    pub sort: i64,
}

/// Fallback percents used when no rule matches a product.
///
/// `prefix_defaults` is checked in order against the product article; the
/// first matching prefix wins. `generic_percent` applies when no prefix does.
#[derive(Debug, Clone)]
pub struct DefaultMarkupPolicy {
    pub prefix_defaults: Vec<(String, f64)>,
    pub generic_percent: f64,
}

impl DefaultMarkupPolicy {
    #[must_use]
    pub fn percent_for(&self, article: &str) -> f64 {
        self.prefix_defaults
            .iter()
            .find(|(prefix, _)| article.starts_with(prefix.as_str()))
            .map_or(self.generic_percent, |(_, percent)| *percent)
    }
}

/// Pick the applicable rule for a product section, if any.
///
/// Section-scoped matches take precedence over unscoped rules; within each
/// class the minimum `(sort, id)` pair wins, so selection is stable across
/// rule-load order.
#[must_use]
pub fn select_rule<'a>(
    section_id: Option<i64>,
    rules: &'a [MarkupRule],
) -> Option<&'a MarkupRule> {
    let best = |scoped: bool| {
        rules
            .iter()
            .filter(|r| {
                if scoped {
                    section_id.is_some() && r.section_id == section_id
                } else {
                    r.section_id.is_none()
                }
            })
            .min_by_key(|r| (r.sort, r.id))
    };

    best(true).or_else(|| best(false))
}

/// Apply the selected rule (or the default policy) to a base price.
///
/// Returns `(final_price, percent_applied)` where
/// `final = base * (1 + percent / 100)`, rounded to the currency minor unit.
#[must_use]
pub fn apply_markup(
    article: &str,
    section_id: Option<i64>,
    base_price: f64,
    rules: &[MarkupRule],
    policy: &DefaultMarkupPolicy,
) -> (f64, f64) {
    let percent = select_rule(section_id, rules)
        .map_or_else(|| policy.percent_for(article), |rule| rule.percent);
    let final_price = round_to_minor_unit(base_price * (1.0 + percent / 100.0));
    (final_price, percent)
}

/// Round half-away-from-zero to two decimal places (kopecks).
///
/// Applied once, at the markup boundary, so the value written to the
/// destination `DECIMAL(_, 2)` column round-trips exactly.
#[must_use]
pub fn round_to_minor_unit(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: i64, section_id: Option<i64>, percent: f64, sort: i64) -> MarkupRule {
        MarkupRule {
            id,
            name: format!("rule-{id}"),
            section_id,
            percent,
            sort,
        }
    }

    fn policy() -> DefaultMarkupPolicy {
        DefaultMarkupPolicy {
            prefix_defaults: vec![("тов-".to_string(), -10.0)],
            generic_percent: 30.0,
        }
    }

    // -----------------------------------------------------------------------
    // select_rule
    // -----------------------------------------------------------------------

    #[test]
    fn scoped_rule_beats_catch_all() {
        let rules = vec![rule(1, None, 30.0, 100), rule(2, Some(7), 15.0, 500)];
        let selected = select_rule(Some(7), &rules).unwrap();
        assert_eq!(selected.id, 2);
    }

    #[test]
    fn falls_back_to_catch_all_when_no_section_match() {
        let rules = vec![rule(1, None, 30.0, 100), rule(2, Some(7), 15.0, 500)];
        let selected = select_rule(Some(99), &rules).unwrap();
        assert_eq!(selected.id, 1);
    }

    #[test]
    fn lower_sort_wins_within_class() {
        let rules = vec![rule(1, Some(7), 10.0, 500), rule(2, Some(7), 20.0, 100)];
        let selected = select_rule(Some(7), &rules).unwrap();
        assert_eq!(selected.id, 2);
    }

    #[test]
    fn equal_sort_broken_by_lowest_id() {
        let rules = vec![rule(9, Some(7), 10.0, 500), rule(3, Some(7), 20.0, 500)];
        let selected = select_rule(Some(7), &rules).unwrap();
        assert_eq!(selected.id, 3);
    }

    #[test]
    fn product_without_section_only_matches_catch_all() {
        let rules = vec![rule(1, Some(7), 15.0, 100), rule(2, None, 30.0, 500)];
        let selected = select_rule(None, &rules).unwrap();
        assert_eq!(selected.id, 2);
    }

    #[test]
    fn no_rules_selects_nothing() {
        assert!(select_rule(Some(7), &[]).is_none());
    }

    // -----------------------------------------------------------------------
    // apply_markup
    // -----------------------------------------------------------------------

    #[test]
    fn scoped_rule_applied_over_catch_all() {
        let rules = vec![rule(1, None, 10.0, 100), rule(2, Some(7), 30.0, 500)];
        let (final_price, percent) = apply_markup("тов-103516", Some(7), 100.0, &rules, &policy());
        assert!((final_price - 130.0).abs() < 1e-9);
        assert!((percent - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_rules_uses_prefix_default_not_zero() {
        let (final_price, percent) = apply_markup("тов-114289", Some(7), 100.0, &[], &policy());
        assert!((percent - (-10.0)).abs() < f64::EPSILON);
        assert!((final_price - 90.0).abs() < 1e-9);
    }

    #[test]
    fn no_rules_uses_generic_default_for_other_prefixes() {
        let (final_price, percent) = apply_markup("osn-000123", None, 100.0, &[], &policy());
        assert!((percent - 30.0).abs() < f64::EPSILON);
        assert!((final_price - 130.0).abs() < 1e-9);
    }

    #[test]
    fn negative_percent_is_a_discount() {
        let rules = vec![rule(1, None, -10.0, 100)];
        let (final_price, _) = apply_markup("тов-1", None, 92.0, &rules, &policy());
        assert!((final_price - 82.8).abs() < 1e-9);
    }

    #[test]
    fn result_is_rounded_to_kopecks() {
        let rules = vec![rule(1, None, 33.0, 100)];
        // 99.99 * 1.33 = 132.9867 → 132.99
        let (final_price, _) = apply_markup("тов-1", None, 99.99, &rules, &policy());
        assert!((final_price - 132.99).abs() < 1e-9);
    }

    #[test]
    fn round_to_minor_unit_truncates_float_noise() {
        assert!((round_to_minor_unit(0.1 + 0.2) - 0.3).abs() < 1e-9);
        assert!((round_to_minor_unit(2.675_1) - 2.68).abs() < 1e-9);
        assert!((round_to_minor_unit(-1.2349) - (-1.23)).abs() < 1e-9);
    }
}
