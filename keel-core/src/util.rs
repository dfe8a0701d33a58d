/// Write `values` through `f`, inserting `separator` between the items that
/// actually produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// snake_case conversion used to derive a host-language field name from a SQL
/// column name (`FirstName` -> `first_name`, `employee_id` stays put).
pub fn to_snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_handles_pascal_and_existing_snake() {
        assert_eq!(to_snake_case("FirstName"), "first_name");
        assert_eq!(to_snake_case("employee_id"), "employee_id");
        assert_eq!(to_snake_case("ID"), "id");
        assert_eq!(to_snake_case("EmployeeKey2"), "employee_key2");
    }

    #[test]
    fn separator_only_between_produced_items() {
        let mut out = String::new();
        separated_by(&mut out, ["a", "", "b"], |out, v| out.push_str(v), ", ");
        assert_eq!(out, "a, b");
    }
}
