use fmp_uncased::AsUncased;
use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, opt},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

/// `param1` bit set by `edgevfx`.
pub const PARAM1_EDGE_VFX: i32 = 0x1;
/// `param1` bit set by `float`.
pub const PARAM1_FLOAT: i32 = 0x2;

/// Collision flags parsed from a `@[...]` tag in a submesh name.
///
/// `name@[convex, fragment=2, param1=5]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshOptions {
    pub convex: bool,
    pub fragment_group: i32,
    pub param1_edge_vfx: bool,
    pub param1_float: bool,
    /// Overrides the `param1` flags if not -1.
    pub param1_custom: i32,
    /// Overrides `param2` if not -1.
    pub param2_custom: i32,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            convex: false,
            fragment_group: 0,
            param1_edge_vfx: false,
            param1_float: false,
            param1_custom: -1,
            param2_custom: -1,
        }
    }
}

fn key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn value(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c != ',' && c != ']')(input)
}

fn entry(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    delimited(
        multispace0,
        pair(
            key,
            opt(preceded(delimited(multispace0, char('='), multispace0), value)),
        ),
        multispace0,
    )(input)
}

/// Everything after `@[` up to and including the closing `]`.
///
/// Empty entries, as left by stray commas, are skipped.
fn tag_body(input: &str) -> IResult<&str, Vec<(&str, Option<&str>)>> {
    terminated(
        map(
            separated_list0(char(','), preceded(multispace0, opt(entry))),
            |entries| entries.into_iter().flatten().collect(),
        ),
        preceded(multispace0, char(']')),
    )(input)
}

fn parse_bool(value: Option<&str>) -> Option<bool> {
    match value.map(str::trim) {
        None => Some(true),
        Some(value) if value.as_uncased().is_any_of(&["true", "1"]) => Some(true),
        Some(value) if value.as_uncased().is_any_of(&["false", "0"]) => Some(false),
        Some(_) => None,
    }
}

fn parse_int(value: Option<&str>) -> Option<i32> {
    value.and_then(|value| value.trim().parse().ok())
}

impl MeshOptions {
    /// Parses the first well-formed `@[...]` tag in `name`.
    ///
    /// Names without a tag give the defaults. Unknown keys and values that
    /// don't parse are ignored.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let entries = name
            .match_indices("@[")
            .find_map(|(index, _)| tag_body(&name[index + 2..]).ok())
            .map(|(_, entries)| entries)
            .unwrap_or_default();

        let mut options = Self::default();
        for (key, value) in entries {
            let key = key.as_uncased();

            if key == "convex" {
                if let Some(convex) = parse_bool(value) {
                    options.convex = convex;
                }
            } else if key.is_any_of(&["fragment", "fragments", "fragmentgroup"]) {
                if let Some(group) = parse_int(value) {
                    options.fragment_group = group;
                }
            } else if key.is_any_of(&["edgevfx", "param1_edgevfx"]) {
                if let Some(edge_vfx) = parse_bool(value) {
                    options.param1_edge_vfx = edge_vfx;
                }
            } else if key.is_any_of(&["float", "param1_float"]) {
                if let Some(float) = parse_bool(value) {
                    options.param1_float = float;
                }
            } else if key == "param1" {
                if let Some(param1) = parse_int(value) {
                    options.param1_custom = param1;
                }
            } else if key == "param2" {
                if let Some(param2) = parse_int(value) {
                    options.param2_custom = param2;
                }
            }
        }

        options
    }

    /// Whether two submeshes can share a havok group.
    #[must_use]
    pub fn compare(&self, other: &Self) -> bool {
        self == other
    }

    /// The `param1` value written to collider instances.
    #[must_use]
    pub fn param1(&self) -> i32 {
        if self.param1_custom != -1 {
            return self.param1_custom;
        }

        let mut param1 = 0;
        if self.param1_edge_vfx {
            param1 |= PARAM1_EDGE_VFX;
        }
        if self.param1_float {
            param1 |= PARAM1_FLOAT;
        }
        param1
    }

    /// The `param2` value written to collider instances.
    #[must_use]
    pub fn param2(&self) -> i32 {
        if self.param2_custom == -1 {
            0
        } else {
            self.param2_custom
        }
    }

    /// Renders the non-default fields as a `@[...]` tag, empty if all are default.
    #[must_use]
    pub fn to_tag(&self) -> String {
        let mut entries = Vec::new();
        if self.convex {
            entries.push("convex".to_owned());
        }
        if self.fragment_group != 0 {
            entries.push(format!("fragment={}", self.fragment_group));
        }
        if self.param1_edge_vfx {
            entries.push("edgevfx".to_owned());
        }
        if self.param1_float {
            entries.push("float".to_owned());
        }
        if self.param1_custom != -1 {
            entries.push(format!("param1={}", self.param1_custom));
        }
        if self.param2_custom != -1 {
            entries.push(format!("param2={}", self.param2_custom));
        }

        if entries.is_empty() {
            String::new()
        } else {
            format!("@[{}]", entries.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_names_are_default() {
        assert_eq!(MeshOptions::parse("foo"), MeshOptions::default());
        assert_eq!(MeshOptions::parse("foo@[]"), MeshOptions::default());
        assert_eq!(MeshOptions::parse("foo@[convex"), MeshOptions::default());
    }

    #[test]
    fn parses_convex_and_fragment() {
        let options = MeshOptions::parse("foo@[convex,fragment=3]");

        assert_eq!(
            options,
            MeshOptions {
                convex: true,
                fragment_group: 3,
                ..MeshOptions::default()
            }
        );
    }

    #[test]
    fn keys_are_case_insensitive_and_aliased() {
        let options = MeshOptions::parse(
            "wall.001@[ Convex , FragmentGroup = 2, PARAM1_EDGEVFX, float=0, param2=7, unknown=5]",
        );

        assert!(options.convex);
        assert_eq!(options.fragment_group, 2);
        assert!(options.param1_edge_vfx);
        assert!(!options.param1_float);
        assert_eq!(options.param1_custom, -1);
        assert_eq!(options.param2_custom, 7);
    }

    #[test]
    fn malformed_values_are_ignored() {
        let options = MeshOptions::parse("foo@[fragment=abc, convex=maybe, param1=4]");

        assert_eq!(options.fragment_group, 0);
        assert!(!options.convex);
        assert_eq!(options.param1_custom, 4);
    }

    #[test]
    fn stray_commas_keep_the_tag() {
        let expected = MeshOptions {
            convex: true,
            fragment_group: 3,
            ..MeshOptions::default()
        };

        for name in [
            "wall@[convex, fragment=3,]",
            "wall@[convex, fragment=3, ]",
            "wall@[,convex, fragment=3]",
            "wall@[convex,, fragment=3]",
            "wall@[ , convex , , fragment=3 , ]",
        ] {
            assert_eq!(MeshOptions::parse(name), expected, "{}", name);
        }
        assert_eq!(MeshOptions::parse("wall@[,]"), MeshOptions::default());
    }

    #[test]
    fn compare_reports_any_difference() {
        let a = MeshOptions::default();
        let mut b = MeshOptions::default();
        assert!(a.compare(&a));
        assert!(a.compare(&b));
        assert!(b.compare(&a));

        b.fragment_group = 1;
        assert!(!a.compare(&b));
        assert!(!b.compare(&a));

        let variants = [
            MeshOptions {
                convex: true,
                ..a
            },
            MeshOptions {
                param1_edge_vfx: true,
                ..a
            },
            MeshOptions {
                param1_float: true,
                ..a
            },
            MeshOptions {
                param1_custom: 0,
                ..a
            },
            MeshOptions {
                param2_custom: 0,
                ..a
            },
        ];
        for variant in variants {
            assert!(!a.compare(&variant));
        }
    }

    #[test]
    fn tag_round_trips() {
        let options = [
            MeshOptions::default(),
            MeshOptions::parse("foo@[convex, fragment=3]"),
            MeshOptions::parse("foo@[edgevfx, float, param2=9]"),
            MeshOptions::parse("foo@[fragment=-2, param1=12]"),
        ];

        for options in options {
            let name = format!("mesh_0{}", options.to_tag());
            assert_eq!(MeshOptions::parse(&name), options, "{}", name);
        }
        assert_eq!(MeshOptions::default().to_tag(), "");
    }

    #[test]
    fn resolved_params() {
        let mut options = MeshOptions::parse("foo@[edgevfx, float]");
        assert_eq!(options.param1(), PARAM1_EDGE_VFX | PARAM1_FLOAT);
        assert_eq!(options.param2(), 0);

        options.param1_custom = 40;
        options.param2_custom = 3;
        assert_eq!(options.param1(), 40);
        assert_eq!(options.param2(), 3);
    }
}
