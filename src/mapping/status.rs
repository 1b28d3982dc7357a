//! Redirect status code policy.

use crate::mapping::rule::MappingRule;

/// Status used when a mapping has no code configured.
pub const DEFAULT_MAPPING_STATUS: u16 = 303;

/// Final status code for a redirect through `rule`.
///
/// 308 and 307 preserve the request method and body; a rule that forwards
/// POST bodies upgrades 301 and 303 to them. Other codes have no
/// method-preserving counterpart and pass through unchanged.
pub fn resolve_status(rule: &MappingRule) -> u16 {
    let code = if rule.status_code == 0 {
        DEFAULT_MAPPING_STATUS
    } else {
        rule.status_code
    };

    match (code, rule.forward_post_body) {
        (301, true) => 308,
        (303, true) => 307,
        (code, _) => code,
    }
}
