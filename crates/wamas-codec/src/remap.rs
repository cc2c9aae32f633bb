use crate::encoder::{EncodedLine, LineContext, ParentIdRegistry, TelegramEncoder};
use crate::telegram::Telegram;
use crate::{Error, Result};
use tracing::{debug, info};

/// Convert a decoded telegram into its WAMAS confirmation telegram.
///
/// Input types are processed in order of first appearance, each one through
/// all of its registered targets, each target over all lines of the input
/// type. Line numbers and parent ids are shared across the whole run. Values
/// are copied without timezone conversion.
///
/// # Errors
///
/// Returns [`Error::UnsupportedConversion`] when any input type has no
/// registered conversion, before anything is written.
pub fn remap_telegram(
    encoder: &mut TelegramEncoder<'_>,
    telegram: &Telegram,
) -> Result<Vec<EncodedLine>> {
    let registry = encoder.registry();
    let unsupported: Vec<&str> = telegram
        .record_types()
        .filter(|t| registry.conversion_targets(t).is_none())
        .collect();
    if !unsupported.is_empty() {
        return Err(Error::UnsupportedConversion(unsupported.join(", ")));
    }

    let mut parent_ids = ParentIdRegistry::new();
    let mut out = Vec::with_capacity(telegram.len());
    let mut line_idx = 0;

    for record_type in telegram.record_types() {
        let targets = registry.conversion_targets(record_type).unwrap_or_default();
        for target in targets {
            let grammar = registry
                .output_grammar(target)
                .ok_or_else(|| wamas_grammar::Error::NotFound(target.clone()))?;
            debug!(from = record_type, to = %target, "remapping record type");
            for line in telegram.lines(record_type) {
                line_idx += 1;
                let ctx = LineContext {
                    line_idx,
                    position: None,
                    record_type_out: target,
                    convert_tz: false,
                };
                out.push(encoder.encode_fields(&line.fields, grammar, &ctx, &mut parent_ids)?);
            }
        }
    }

    info!(input = telegram.len(), output = out.len(), "telegram remapped");
    Ok(out)
}
