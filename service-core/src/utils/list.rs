/// Delimiter used for owner, approver and header-criteria lists.
pub const LIST_DELIMITER: char = ',';

/// Split a delimiter-joined list verbatim.
///
/// Entries are neither trimmed nor filtered, so `""` yields `[""]` and
/// `"a,,b"` yields `["a", "", "b"]`. Joining the result with the same
/// delimiter reproduces the input.
pub fn split_list(value: &str) -> Vec<String> {
    value.split(LIST_DELIMITER).map(str::to_string).collect()
}
