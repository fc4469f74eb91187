//! Parser for property path lists (`"total, customer.name"`).

use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, recognize},
    multi::separated_list1,
    sequence::{delimited, pair},
    IResult,
};
use rxgen_core::PropertyPath;

/// Parse a Rust identifier.
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// Parse a dotted path (`customer.name`).
fn dotted(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char('.'), identifier)(input)
}

/// Parse a comma separated list of dotted paths.
fn path_list(input: &str) -> IResult<&str, Vec<Vec<&str>>> {
    delimited(
        multispace0,
        separated_list1(delimited(multispace0, char(','), multispace0), dotted),
        multispace0,
    )(input)
}

/// Parse a property path list.
///
/// Each entry is either a local property or `reference.property`; deeper
/// chains are rejected since only one level of indirection is observed.
pub fn parse_property_paths(input: &str) -> Result<Vec<PropertyPath>, String> {
    let (_, paths) = all_consuming(path_list)(input)
        .map_err(|_| format!("invalid property list `{}`", input))?;

    paths
        .into_iter()
        .map(|segments| match segments.as_slice() {
            [property] => Ok(PropertyPath::local(*property)),
            [reference, property] => Ok(PropertyPath::through(*reference, *property)),
            _ => Err(format!(
                "`{}` reaches through more than one model reference",
                segments.join(".")
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_and_reference_paths() {
        let paths = parse_property_paths(" total , customer.name").unwrap();
        assert_eq!(
            paths,
            vec![
                PropertyPath::local("total"),
                PropertyPath::through("customer", "name"),
            ]
        );
    }

    #[test]
    fn test_deep_chain_is_rejected() {
        let err = parse_property_paths("a.b.c").unwrap_err();
        assert!(err.contains("more than one model reference"));
    }

    #[test]
    fn test_malformed_list() {
        assert!(parse_property_paths("").is_err());
        assert!(parse_property_paths("total,").is_err());
        assert!(parse_property_paths("1abc").is_err());
    }
}
