//! Flag categories and the per-compiler flag set.
//!
//! Flag values arrive from configuration either as a single string or as a
//! list. Strings are tokenized so that a flag keeps the values that follow
//! it: `"-O0 -foo-flag foo-val"` becomes the two atoms `-O0` and
//! `-foo-flag foo-val`. Lists are taken verbatim.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CompilerError;
use super::Role;

/// A category of user-supplied flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlagCategory {
    Cflags,
    Cxxflags,
    Fflags,
    Cppflags,
    Ldflags,
    Ldlibs,
}

impl FlagCategory {
    pub const ALL: [FlagCategory; 6] = [
        FlagCategory::Cflags,
        FlagCategory::Cxxflags,
        FlagCategory::Fflags,
        FlagCategory::Cppflags,
        FlagCategory::Ldflags,
        FlagCategory::Ldlibs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlagCategory::Cflags => "cflags",
            FlagCategory::Cxxflags => "cxxflags",
            FlagCategory::Fflags => "fflags",
            FlagCategory::Cppflags => "cppflags",
            FlagCategory::Ldflags => "ldflags",
            FlagCategory::Ldlibs => "ldlibs",
        }
    }

    /// The compiler roles whose invocations receive this category.
    pub fn roles(&self) -> &'static [Role] {
        match self {
            FlagCategory::Cflags => &[Role::Cc],
            FlagCategory::Cxxflags => &[Role::Cxx],
            FlagCategory::Fflags => &[Role::F77, Role::Fc],
            FlagCategory::Cppflags | FlagCategory::Ldflags | FlagCategory::Ldlibs => &Role::ALL,
        }
    }

    pub fn applies_to(&self, role: Role) -> bool {
        self.roles().contains(&role)
    }
}

impl FromStr for FlagCategory {
    type Err = CompilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlagCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                CompilerError::invalid_config(format!(
                    "unknown flag category `{}` (expected one of cflags, cxxflags, fflags, cppflags, ldflags, ldlibs)",
                    s
                ))
            })
    }
}

impl fmt::Display for FlagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A raw flag value as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Text(String),
    List(Vec<String>),
}

/// Split a flag string into atoms.
///
/// Tokens are separated by whitespace; a token that does not start with
/// `-` is joined (with one space) onto the atom before it.
pub fn tokenize_flags(value: &str) -> Vec<String> {
    let mut atoms: Vec<String> = Vec::new();
    for token in value.split_whitespace() {
        match atoms.last_mut() {
            Some(last) if !token.starts_with('-') => {
                last.push(' ');
                last.push_str(token);
            }
            _ => atoms.push(token.to_string()),
        }
    }
    atoms
}

/// Compose the atoms for one raw configuration value.
///
/// `None` yields nothing, text is tokenized, lists are copied.
pub fn compose_value(value: Option<&FlagValue>) -> Vec<String> {
    match value {
        None => Vec::new(),
        Some(FlagValue::Text(text)) => tokenize_flags(text),
        Some(FlagValue::List(list)) => list.clone(),
    }
}

/// Expand atoms into command-line words, in order.
///
/// A grouped atom such as `-foo-flag foo-val` becomes two arguments.
pub fn atoms_to_args<'a>(atoms: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
    atoms.iter().flat_map(|atom| atom.split_whitespace())
}

/// Normalized user flags of a compiler, keyed by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    flags: BTreeMap<FlagCategory, Vec<String>>,
}

impl FlagSet {
    pub fn new() -> Self {
        FlagSet::default()
    }

    /// Build from a configuration mapping of category name to raw value.
    pub fn from_config(raw: &BTreeMap<String, Option<FlagValue>>) -> Result<Self, CompilerError> {
        let mut set = FlagSet::new();
        for (name, value) in raw {
            let category: FlagCategory = name.parse()?;
            set.set(category, compose_value(value.as_ref()));
        }
        Ok(set)
    }

    /// The ordered atoms configured for `category`; empty if none.
    pub fn compose(&self, category: FlagCategory) -> Vec<String> {
        self.get(category).to_vec()
    }

    pub fn get(&self, category: FlagCategory) -> &[String] {
        self.flags.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the atoms of `category`. An empty list removes the category.
    pub fn set<I, S>(&mut self, category: FlagCategory, atoms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let atoms: Vec<String> = atoms.into_iter().map(Into::into).collect();
        if atoms.is_empty() {
            self.flags.remove(&category);
        } else {
            self.flags.insert(category, atoms);
        }
    }

    pub fn clear(&mut self) {
        self.flags.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Iterate non-empty categories in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (FlagCategory, &[String])> {
        self.flags.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    /// Atoms for an invocation of `role`, in category order.
    pub fn for_role(&self, role: Role) -> Vec<String> {
        self.iter()
            .filter(|(category, _)| category.applies_to(role))
            .flat_map(|(_, atoms)| atoms.iter().cloned())
            .collect()
    }

    /// Back to configuration form; every category is written as a list.
    pub fn to_config(&self) -> BTreeMap<String, Option<FlagValue>> {
        self.iter()
            .map(|(category, atoms)| {
                (
                    category.as_str().to_string(),
                    Some(FlagValue::List(atoms.to_vec())),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_from_config_are_grouped() {
        let mut raw = BTreeMap::new();
        raw.insert(
            "cflags".to_string(),
            Some(FlagValue::Text("-O0 -foo-flag foo-val".to_string())),
        );

        let set = FlagSet::from_config(&raw).unwrap();
        let cflags = set.compose(FlagCategory::Cflags);
        assert_eq!(cflags, vec!["-O0", "-foo-flag foo-val"]);
        assert!(cflags.iter().any(|x| x == "-foo-flag foo-val"));
    }

    #[test]
    fn test_tokenize_flags() {
        assert_eq!(tokenize_flags(""), Vec::<String>::new());
        assert_eq!(tokenize_flags("   "), Vec::<String>::new());
        assert_eq!(tokenize_flags("-O2"), vec!["-O2"]);
        assert_eq!(
            tokenize_flags("-I /opt/include -DNDEBUG  -Xlinker -rpath -Xlinker /x"),
            vec!["-I /opt/include", "-DNDEBUG", "-Xlinker", "-rpath", "-Xlinker /x"]
        );
        assert_eq!(tokenize_flags("value -flag"), vec!["value", "-flag"]);
        assert_eq!(tokenize_flags("a b"), vec!["a b"]);
    }

    #[test]
    fn test_compose_value() {
        assert!(compose_value(None).is_empty());

        let list = FlagValue::List(vec!["-foo-flag foo-val".to_string(), "-g".to_string()]);
        assert_eq!(compose_value(Some(&list)), vec!["-foo-flag foo-val", "-g"]);
    }

    #[test]
    fn test_null_and_unknown_categories() {
        let mut raw = BTreeMap::new();
        raw.insert("ldflags".to_string(), None);
        let set = FlagSet::from_config(&raw).unwrap();
        assert!(set.is_empty());
        assert!(set.compose(FlagCategory::Ldflags).is_empty());

        raw.insert("fcflags".to_string(), None);
        let err = FlagSet::from_config(&raw).unwrap_err();
        assert!(err.to_string().contains("unknown flag category `fcflags`"));
    }

    #[test]
    fn test_for_role() {
        let mut set = FlagSet::new();
        set.set(FlagCategory::Cflags, ["-O2"]);
        set.set(FlagCategory::Cxxflags, ["-std=c++17"]);
        set.set(FlagCategory::Fflags, ["-ffixed-form"]);
        set.set(FlagCategory::Cppflags, ["-DNDEBUG"]);
        set.set(FlagCategory::Ldflags, ["-L/opt/lib"]);

        assert_eq!(set.for_role(Role::Cc), vec!["-O2", "-DNDEBUG", "-L/opt/lib"]);
        assert_eq!(
            set.for_role(Role::Cxx),
            vec!["-std=c++17", "-DNDEBUG", "-L/opt/lib"]
        );
        assert_eq!(
            set.for_role(Role::F77),
            vec!["-ffixed-form", "-DNDEBUG", "-L/opt/lib"]
        );
    }

    #[test]
    fn test_atoms_to_args() {
        let atoms = vec!["-O0".to_string(), "-foo-flag foo-val".to_string()];
        let args: Vec<&str> = atoms_to_args(&atoms).collect();
        assert_eq!(args, vec!["-O0", "-foo-flag", "foo-val"]);
    }

    #[test]
    fn test_to_config_round_trip() {
        let mut raw = BTreeMap::new();
        raw.insert(
            "cxxflags".to_string(),
            Some(FlagValue::Text("-O3 -march=native".to_string())),
        );
        raw.insert("ldlibs".to_string(), Some(FlagValue::List(vec!["-lm".to_string()])));

        let set = FlagSet::from_config(&raw).unwrap();
        let again = FlagSet::from_config(&set.to_config()).unwrap();
        assert_eq!(set, again);
    }

    #[test]
    fn test_set_empty_removes_category() {
        let mut set = FlagSet::new();
        set.set(FlagCategory::Cflags, ["--correct-flag"]);
        assert_eq!(set.get(FlagCategory::Cflags), ["--correct-flag"]);

        set.set(FlagCategory::Cflags, Vec::<String>::new());
        assert!(set.is_empty());
    }
}
