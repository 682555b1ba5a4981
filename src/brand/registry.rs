use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;
use thiserror::Error;

use super::cleanup::normalize;

/// Bumped whenever an alias is added, removed or re-pointed, since class
/// labels of previously organized datasets depend on it.
pub const REGISTRY_VERSION: u32 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Alias declared twice: {alias}")]
    DuplicateAlias { alias: String },

    #[error("Alias is not in normalized form: {alias:?}")]
    InvalidAlias { alias: String },

    #[error("Canonical identifier is not in normalized form: {canonical:?}")]
    InvalidCanonical { canonical: String },
}

/// One brand and every alias known to refer to it.
#[derive(Debug, Clone, Copy)]
pub struct BrandRecord {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

const fn brand(canonical: &'static str, aliases: &'static [&'static str]) -> BrandRecord {
    BrandRecord { canonical, aliases }
}

pub static BUILTIN_BRANDS: &[BrandRecord] = &[
    // Cars
    brand("mercedes-benz", &["mercedes-benz", "mercedes", "amg"]),
    brand("alfa-romeo", &["alfa-romeo"]),
    brand("aston-martin", &["aston-martin"]),
    brand("audi", &["audi"]),
    brand("bentley", &["bentley"]),
    brand("bmw", &["bmw"]),
    brand("bugatti", &["bugatti"]),
    brand("cadillac", &["cadillac"]),
    brand("chevrolet", &["chevrolet", "chevy"]),
    brand("chrysler", &["chrysler"]),
    brand("citroen", &["citroen"]),
    brand("dodge", &["dodge", "ram-trucks", "mopar"]),
    brand("ferrari", &["ferrari"]),
    brand("fiat", &["fiat"]),
    brand("ford", &["ford", "mustang", "shelby"]),
    brand("honda", &["honda"]),
    brand("hyundai", &["hyundai"]),
    brand("jaguar", &["jaguar"]),
    brand("jeep", &["jeep"]),
    brand("kia", &["kia"]),
    brand("lamborghini", &["lamborghini"]),
    brand("lancia", &["lancia"]),
    brand("land-rover", &["land-rover", "range-rover"]),
    brand("lexus", &["lexus"]),
    brand("maserati", &["maserati"]),
    brand("mazda", &["mazda"]),
    brand("mclaren", &["mclaren"]),
    brand("mini-cooper", &["mini-cooper", "mini"]),
    brand("mitsubishi", &["mitsubishi"]),
    brand("nissan", &["nissan"]),
    brand("opel", &["opel"]),
    brand("peugeot", &["peugeot"]),
    brand("porsche", &["porsche"]),
    brand("renault", &["renault"]),
    brand("rolls-royce", &["rolls-royce"]),
    brand("saab", &["saab"]),
    brand("seat", &["seat"]),
    brand("skoda", &["skoda"]),
    brand("subaru", &["subaru"]),
    brand("suzuki", &["suzuki"]),
    brand("toyota", &["toyota"]),
    brand("volkswagen", &["volkswagen", "vw"]),
    brand("volvo", &["volvo"]),
    // Apparel and luxury
    brand("adidas", &["adidas"]),
    brand("nike", &["nike", "jordan"]),
    brand("puma", &["puma"]),
    brand("reebok", &["reebok"]),
    brand("under-armour", &["under-armour"]),
    brand("lacoste", &["lacoste"]),
    brand("fila", &["fila"]),
    brand("vans", &["vans"]),
    brand("converse", &["converse"]),
    brand("new-balance", &["new-balance"]),
    brand("asics", &["asics"]),
    brand("diadora", &["diadora"]),
    brand("kappa", &["kappa"]),
    brand("le-coq-sportif", &["le-coq-sportif"]),
    brand("lotto", &["lotto"]),
    brand("umbro", &["umbro"]),
    brand("ralph-lauren", &["ralph-lauren", "polo"]),
    brand("tommy-hilfiger", &["tommy-hilfiger"]),
    brand("calvin-klein", &["calvin-klein"]),
    brand("levis", &["levi-strauss", "levis"]),
    brand("gucci", &["gucci"]),
    brand("prada", &["prada"]),
    brand("louis-vuitton", &["louis-vuitton"]),
    brand("hermes", &["hermes"]),
    brand("chanel", &["chanel"]),
    brand("dior", &["dior"]),
    brand("burberry", &["burberry"]),
    brand("versace", &["versace"]),
    brand("armani", &["armani"]),
    brand("zara", &["zara"]),
    // Technology
    brand("apple", &["apple", "iphone", "ipad", "macbook", "icloud"]),
    brand("google", &["google", "android", "chrome", "gmail", "youtube"]),
    brand("microsoft", &["microsoft", "windows", "xbox", "office", "azure"]),
    brand("amazon", &["amazon", "aws", "kindle", "alexa"]),
    brand("meta", &["facebook", "meta", "instagram", "whatsapp"]),
    brand("samsung", &["samsung"]),
    brand("sony", &["sony", "playstation"]),
    brand("intel", &["intel"]),
    brand("amd", &["amd"]),
    brand("nvidia", &["nvidia"]),
    brand("dell", &["dell"]),
    brand("hp", &["hp", "hewlett-packard"]),
    brand("ibm", &["ibm"]),
    brand("oracle", &["oracle"]),
    brand("sap", &["sap"]),
    brand("cisco", &["cisco"]),
    brand("huawei", &["huawei"]),
    brand("xiaomi", &["xiaomi"]),
    brand("nintendo", &["nintendo"]),
    brand("logitech", &["logitech"]),
    // Food and drink
    brand("coca-cola", &["coca-cola", "coke"]),
    brand("pepsi", &["pepsi"]),
    brand("mcdonalds", &["mcdonalds"]),
    brand("burger-king", &["burger-king"]),
    brand("starbucks", &["starbucks"]),
    brand("nestle", &["nestle"]),
    brand("danone", &["danone"]),
    brand("heineken", &["heineken"]),
    brand("budweiser", &["budweiser"]),
    brand("kfc", &["kfc"]),
    // Football clubs
    brand("fc-barcelona", &["barcelona"]),
    brand("real-madrid", &["real-madrid"]),
    brand("manchester-united", &["manchester-united"]),
    brand("liverpool-fc", &["liverpool"]),
    brand("chelsea-fc", &["chelsea"]),
    brand("arsenal-fc", &["arsenal"]),
    brand("manchester-city", &["manchester-city"]),
    brand("juventus", &["juventus"]),
    brand("inter-milan", &["inter-milan", "internazionale"]),
    brand("ac-milan", &["ac-milan"]),
    brand("bayern-munich", &["bayern-munich", "bayern"]),
    brand("borussia-dortmund", &["borussia-dortmund"]),
    brand("paris-saint-germain", &["paris-saint-germain", "psg"]),
    brand("ajax", &["ajax"]),
    brand("boca-juniors", &["boca-juniors"]),
    brand("river-plate", &["river-plate"]),
    brand("flamengo", &["flamengo"]),
    brand("corinthians", &["corinthians"]),
    // Other
    brand("shell", &["shell"]),
    brand("esso", &["esso"]),
    brand("bp", &["bp"]),
    brand("total", &["total"]),
    brand("castrol", &["castrol"]),
    brand("michelin", &["michelin"]),
    brand("goodyear", &["goodyear"]),
    brand("pirelli", &["pirelli"]),
    brand("bridgestone", &["bridgestone"]),
    brand("continental", &["continental"]),
    brand("ethereum", &["ethereum", "eth"]),
    brand("bitcoin", &["bitcoin"]),
];

static BUILTIN: LazyLock<Registry> = LazyLock::new(|| {
    Registry::from_records(BUILTIN_BRANDS).expect("built-in brand table is well formed")
});

/// Immutable alias → canonical identifier table.
///
/// Aliases are kept longest-first so that prefix matching always prefers the
/// most specific alias (`mercedes-benz` before `mercedes`). Equal lengths keep
/// declaration order.
#[derive(Debug, Clone)]
pub struct Registry {
    ordered: Vec<(String, String)>,
    exact: HashMap<String, usize>,
}

impl Registry {
    /// The registry compiled into the binary.
    pub fn builtin() -> &'static Registry {
        &BUILTIN
    }

    pub fn from_records(records: &[BrandRecord]) -> Result<Self, RegistryError> {
        let pairs = records.iter().flat_map(|record| {
            record
                .aliases
                .iter()
                .map(move |alias| (alias.to_string(), record.canonical.to_string()))
        });

        let mut entries: Vec<(String, String)> = Vec::new();
        let mut seen = HashSet::new();
        for (alias, canonical) in pairs {
            check_normalized(&alias, &canonical)?;
            if !seen.insert(alias.clone()) {
                return Err(RegistryError::DuplicateAlias { alias });
            }
            entries.push((alias, canonical));
        }

        Ok(Self::from_entries(entries))
    }

    /// Returns a copy of this registry with `overrides` applied.
    ///
    /// Keys and values are normalized first. An override of an existing alias
    /// re-points it; a new alias is added.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, String>) -> Result<Self, RegistryError> {
        let mut entries = self.ordered.clone();
        let mut index = self.exact.clone();

        for (alias, canonical) in overrides {
            let alias = normalize(alias);
            let canonical = normalize(canonical);
            check_normalized(&alias, &canonical)?;

            match index.get(&alias) {
                Some(&position) => entries[position].1 = canonical,
                None => {
                    index.insert(alias.clone(), entries.len());
                    entries.push((alias, canonical));
                }
            }
        }

        Ok(Self::from_entries(entries))
    }

    fn from_entries(mut entries: Vec<(String, String)>) -> Self {
        // stable sort: ties keep declaration order
        entries.sort_by_key(|(alias, _)| std::cmp::Reverse(alias.chars().count()));

        let exact = entries
            .iter()
            .enumerate()
            .map(|(index, (alias, _))| (alias.clone(), index))
            .collect();

        Self { ordered: entries, exact }
    }

    /// Canonical identifier for a name that is exactly an alias.
    pub fn lookup_exact(&self, name: &str) -> Option<&str> {
        self.exact
            .get(name)
            .map(|&index| self.ordered[index].1.as_str())
    }

    /// Canonical identifier for the most specific alias `a` such that `name`
    /// starts with `a-`.
    pub fn lookup_prefix(&self, name: &str) -> Option<&str> {
        self.ordered
            .iter()
            .find(|(alias, _)| {
                name.strip_prefix(alias.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
            })
            .map(|(_, canonical)| canonical.as_str())
    }

    /// Alias / canonical pairs, most specific first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ordered
            .iter()
            .map(|(alias, canonical)| (alias.as_str(), canonical.as_str()))
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

fn check_normalized(alias: &str, canonical: &str) -> Result<(), RegistryError> {
    if alias.is_empty() || normalize(alias) != alias {
        return Err(RegistryError::InvalidAlias {
            alias: alias.to_string(),
        });
    }
    if canonical.is_empty() || normalize(canonical) != canonical {
        return Err(RegistryError::InvalidCanonical {
            canonical: canonical.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = Registry::builtin();
        let alias_count: usize = BUILTIN_BRANDS.iter().map(|r| r.aliases.len()).sum();
        assert_eq!(registry.len(), alias_count);
    }

    #[test]
    fn test_aliases_are_sorted_longest_first() {
        let lengths: Vec<usize> = Registry::builtin()
            .iter()
            .map(|(alias, _)| alias.chars().count())
            .collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_prefix_prefers_specific_alias() {
        let records = [
            brand("mini", &["mini"]),
            brand("mini-cooper", &["mini-cooper"]),
        ];
        let registry = Registry::from_records(&records).unwrap();

        assert_eq!(registry.lookup_prefix("mini-cooper-s"), Some("mini-cooper"));
        assert_eq!(registry.lookup_prefix("mini-one"), Some("mini"));
        assert_eq!(registry.lookup_prefix("minimal-logo"), None);
    }

    #[test]
    fn test_prefix_requires_hyphen_boundary() {
        let registry = Registry::builtin();
        assert_eq!(registry.lookup_prefix("kia"), None);
        assert_eq!(registry.lookup_prefix("kiaora-cafe"), None);
        assert_eq!(registry.lookup_prefix("kia-motors"), Some("kia"));
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let records = [brand("ford", &["ford"]), brand("fordham", &["ford"])];
        assert_eq!(
            Registry::from_records(&records).unwrap_err(),
            RegistryError::DuplicateAlias {
                alias: "ford".to_string()
            }
        );
    }

    #[test]
    fn test_unnormalized_alias_rejected() {
        let records = [brand("ford", &["Ford Motor"])];
        assert!(matches!(
            Registry::from_records(&records),
            Err(RegistryError::InvalidAlias { .. })
        ));
    }

    #[test]
    fn test_overrides_repoint_and_add() {
        let mut overrides = BTreeMap::new();
        overrides.insert("Instagram".to_string(), "instagram".to_string());
        overrides.insert("seat cupra".to_string(), "cupra".to_string());

        let registry = Registry::builtin().with_overrides(&overrides).unwrap();

        assert_eq!(registry.lookup_exact("instagram"), Some("instagram"));
        assert_eq!(registry.lookup_exact("facebook"), Some("meta"));
        assert_eq!(registry.lookup_prefix("seat-cupra-2020"), Some("cupra"));
        assert_eq!(registry.lookup_prefix("seat-ibiza"), Some("seat"));
        assert_eq!(registry.len(), Registry::builtin().len() + 1);
    }

    #[test]
    fn test_overrides_normalizing_to_one_alias_add_it_once() {
        let mut overrides = BTreeMap::new();
        overrides.insert("Tim Hortons".to_string(), "tim-hortons".to_string());
        overrides.insert("tim_hortons".to_string(), "tims".to_string());

        let registry = Registry::builtin().with_overrides(&overrides).unwrap();

        assert_eq!(registry.len(), Registry::builtin().len() + 1);
        assert_eq!(registry.lookup_exact("tim-hortons"), Some("tims"));
    }

    #[test]
    fn test_duplicate_found_across_many_records() {
        let mut records: Vec<BrandRecord> = BUILTIN_BRANDS.to_vec();
        records.push(brand("nike-clone", &["jordan"]));
        assert_eq!(
            Registry::from_records(&records).unwrap_err(),
            RegistryError::DuplicateAlias {
                alias: "jordan".to_string()
            }
        );
    }
}
