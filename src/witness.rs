//! Audit trail of listing lifecycle events
use super::types::TimeStamp;
use std::convert::Infallible;

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct Witness {
    #[n(0)]
    pub listing_id: String,
    #[n(1)]
    pub actor: String, // donor on create, claimant afterwards
    #[n(2)]
    pub timestamp: TimeStamp,
    #[n(3)]
    pub kind: WitnessKind,
}

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub enum WitnessKind {
    #[n(0)]
    Create,
    #[n(1)]
    Claim,
    #[n(2)]
    Handover {
        #[n(0)]
        meals_saved: u64,
        #[n(1)]
        master_override: bool,
    },
}

impl Witness {
    pub fn new(listing_id: String, actor: String, kind: WitnessKind) -> Self {
        Self {
            listing_id,
            actor,
            timestamp: TimeStamp::new(),
            kind,
        }
    }

    /// Encodes the witness and returns its sha256 digest alongside the bytes.
    pub fn build(&self) -> Result<(String, Vec<u8>), minicbor::encode::Error<Infallible>> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_witnesses_share_a_hash() {
        let witness = Witness::new("1".into(), "City Harvest".into(), WitnessKind::Claim);
        let copy = witness.clone();

        let (hash, cbor) = witness.build().unwrap();
        let (copy_hash, _) = copy.build().unwrap();
        assert_eq!(hash, copy_hash);

        let decoded: Witness = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, witness);
    }

    #[test]
    fn kind_changes_the_hash() {
        let claim = Witness::new("1".into(), "a".into(), WitnessKind::Claim);
        let mut create = claim.clone();
        create.kind = WitnessKind::Create;

        assert_ne!(claim.build().unwrap().0, create.build().unwrap().0);
    }
}
