use crate::object::EntityType;

pub const GENERATED_ID_PREFIX: &str = "auto_";

/// Joins the parts of the canonical string. It MUST NOT appear in any id.
const CANONICAL_SEPARATOR: &str = "\u{1f}";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum GeneratedKind {
    Alliance,
    Faction,
    Nomination,
}

impl GeneratedKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alliance => "alliance",
            Self::Faction => "faction",
            Self::Nomination => "nomination",
        }
    }
}

/// The content that determines the identity of a generated object.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IdentityProps<'a> {
    pub election_id: &'a str,
    pub constituency_id: &'a str,
    pub election_round: Option<u32>,
    pub parent_nomination_id: Option<&'a str>,
    pub discriminant: Discriminant<'a>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Discriminant<'a> {
    Nomination { entity_type: EntityType, entity_id: &'a str },
    Alliance { organization_ids: Vec<&'a str> },
    Faction { candidate_ids: Vec<&'a str> },
}

impl Discriminant<'_> {
    #[must_use]
    pub fn kind(&self) -> GeneratedKind {
        match self {
            Self::Nomination { .. } => GeneratedKind::Nomination,
            Self::Alliance { .. } => GeneratedKind::Alliance,
            Self::Faction { .. } => GeneratedKind::Faction,
        }
    }
}

impl IdentityProps<'_> {
    /// The string that is hashed. Member ids are sorted so that their input order does not matter.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        let round = self.election_round.unwrap_or(1).to_string();
        let no_parent = format!("{CANONICAL_SEPARATOR}NONE");
        let mut parts: Vec<&str> = vec![
            CANONICAL_SEPARATOR,
            self.discriminant.kind().as_str(),
            self.election_id,
            self.constituency_id,
            round.as_str(),
            self.parent_nomination_id.unwrap_or(no_parent.as_str()),
        ];
        match &self.discriminant {
            Discriminant::Nomination { entity_type, entity_id } => {
                parts.push(entity_type.as_str());
                parts.push(entity_id);
            }
            Discriminant::Alliance { organization_ids: members }
            | Discriminant::Faction { candidate_ids: members } => {
                let mut sorted = members.clone();
                sorted.sort_unstable();
                parts.extend(sorted);
            }
        }
        parts.join(CANONICAL_SEPARATOR)
    }
}

#[must_use]
pub fn create_deterministic_id(props: &IdentityProps<'_>) -> String {
    format!("{GENERATED_ID_PREFIX}{}", cyrb53(&props.canonical_string(), 0))
}

/// 53-bit string hash over UTF-16 code units, two 32-bit states with Murmur-style mixing.
#[must_use]
pub fn cyrb53(input: &str, seed: u32) -> u64 {
    let mut h1: u32 = 0xdead_beef ^ seed;
    let mut h2: u32 = 0x41c6_ce57 ^ seed;
    for unit in input.encode_utf16() {
        let ch = u32::from(unit);
        h1 = (h1 ^ ch).wrapping_mul(2_654_435_761);
        h2 = (h2 ^ ch).wrapping_mul(1_597_334_677);
    }
    h1 = (h1 ^ (h1 >> 16)).wrapping_mul(2_246_822_507);
    h1 ^= (h2 ^ (h2 >> 13)).wrapping_mul(3_266_489_909);
    h2 = (h2 ^ (h2 >> 16)).wrapping_mul(2_246_822_507);
    h2 ^= (h1 ^ (h1 >> 13)).wrapping_mul(3_266_489_909);
    (u64::from(h2 & 0x001f_ffff) << 32) | u64::from(h1)
}

/// Ids MUST be non-blank strings.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    !id.trim().is_empty()
}
