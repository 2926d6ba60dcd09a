//! Action sharing between co-declared spellings.
//!
//! A descriptor such as `-o, --output=FILE` only attaches the value to the
//! long spelling. [`share_aliases`] copies the actions onto the bare aliases
//! and recomputes `delimiter`/`suffix` for the recipient's length class:
//! long flags join inline values with `=`, short flags glue them directly.
//!
//! # Example
//!
//! ```
//! use argspec_core::*;
//!
//! let mut specs = vec![
//!     ArgSpec::option("-o").with_aliases(["--output"]),
//!     ArgSpec::option("--output")
//!         .with_aliases(["-o"])
//!         .with_style(OptionStyle::SeparateOrInline, "=")
//!         .with_suffix("=")
//!         .with_action(Action::guess("FILE")),
//! ];
//! share_aliases(&mut specs);
//!
//! assert_eq!(specs[0].actions, specs[1].actions);
//! assert_eq!(specs[0].style, OptionStyle::SeparateOrInline);
//! assert_eq!(specs[0].delimiter, "");
//! assert_eq!(specs[0].suffix, " ");
//! ```

use std::collections::HashMap;

use crate::types::{ArgSpec, OptionStyle};

/// Inline delimiter for a length class.
pub fn inline_delimiter(is_long: bool) -> &'static str {
    if is_long { "=" } else { "" }
}

/// Suffix appended after completing a flag of the given shape.
pub fn flag_suffix(style: OptionStyle, delimiter: &str, is_long: bool) -> String {
    match style {
        OptionStyle::Separate => " ".to_string(),
        OptionStyle::SeparateOrInline if !is_long => " ".to_string(),
        OptionStyle::SeparateOrInline | OptionStyle::Inline => delimiter.to_string(),
    }
}

/// Copies actions from spellings that declared a value onto aliases that did
/// not.
///
/// Recipients marked `independent` and recipients that already have actions
/// are left alone. A donor of the same length class is preferred; its
/// delimiter and suffix carry over unchanged. Otherwise they are recomputed
/// for the recipient.
pub fn share_aliases(specs: &mut [ArgSpec]) {
    let index: HashMap<String, usize> = specs
        .iter()
        .enumerate()
        .filter_map(|(idx, spec)| spec.flag().map(|flag| (flag.to_string(), idx)))
        .collect();
    let mut visited = vec![false; specs.len()];

    for start in 0..specs.len() {
        if visited[start] || specs[start].flag().is_none() {
            continue;
        }
        let mut group: Vec<usize> = std::iter::once(start)
            .chain(
                specs[start]
                    .aliases
                    .iter()
                    .filter_map(|alias| index.get(alias).copied()),
            )
            .collect();
        group.sort_unstable();
        group.dedup();
        for &idx in &group {
            visited[idx] = true;
        }

        let donors: Vec<usize> = group
            .iter()
            .copied()
            .filter(|&idx| specs[idx].takes_value() && !specs[idx].independent)
            .collect();
        let Some(&first_donor) = donors.first() else {
            continue;
        };

        for &recipient in &group {
            if specs[recipient].takes_value() || specs[recipient].independent {
                continue;
            }
            let is_long = specs[recipient].is_long();
            let donor_idx = donors
                .iter()
                .copied()
                .find(|&idx| specs[idx].is_long() == is_long)
                .unwrap_or(first_donor);
            let donor = specs[donor_idx].clone();
            let same_class = donor.is_long() == is_long;

            let spec = &mut specs[recipient];
            spec.actions = donor.actions;
            spec.style = donor.style;
            spec.value_optional = donor.value_optional;
            spec.repeatable |= donor.repeatable;
            if same_class {
                spec.delimiter = donor.delimiter;
                spec.suffix = donor.suffix;
            } else {
                spec.delimiter = match donor.style {
                    OptionStyle::Separate => String::new(),
                    _ => inline_delimiter(is_long).to_string(),
                };
                spec.suffix = flag_suffix(spec.style, &spec.delimiter, is_long);
            }
        }
    }
}
