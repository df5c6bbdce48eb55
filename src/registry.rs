//! Type registry, learned from system catalogs at connect time.
//!
//! Three mappings drive decoding of OIDs that are not in the static table in
//! [`crate::postgres::pg_type`]: array element types, composite member OIDs (in
//! attribute order), and enum value labels.
use std::collections::HashMap;

use crate::{Result, postgres::Oid, query::query, transport::PgTransport};

/// Array/composite/enum shape learned from `pg_catalog` at connect time.
///
/// Read-only after [`TypeRegistry::load`]; call it again (and replace the
/// connection's copy) to pick up schema changes made after connect, e.g. a
/// freshly `CREATE TYPE`'d enum.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    /// array type oid -> element oid
    arrays: HashMap<Oid, Oid>,
    /// composite type oid -> ordered member oids
    composites: HashMap<Oid, Vec<Oid>>,
    /// enum type oid -> (value oid -> label)
    enums: HashMap<Oid, HashMap<Oid, String>>,
}

impl TypeRegistry {
    /// Returns the element oid for a registered array type.
    pub fn array_element(&self, oid: Oid) -> Option<Oid> {
        self.arrays.get(&oid).copied()
    }

    /// Returns the ordered member oids for a registered composite type.
    pub fn composite_members(&self, oid: Oid) -> Option<&[Oid]> {
        self.composites.get(&oid).map(Vec::as_slice)
    }

    /// Returns `true` if `oid` names a registered enum type.
    pub fn is_enum(&self, oid: Oid) -> bool {
        self.enums.contains_key(&oid)
    }

    /// Resolve a label string for an enum value, given its owning enum type oid.
    pub fn enum_label(&self, type_oid: Oid, value_oid: Oid) -> Option<&str> {
        self.enums.get(&type_oid)?.get(&value_oid).map(String::as_str)
    }

    /// Load every mapping from `pg_catalog` over `io`. Runs three round trips.
    pub async fn load<IO: PgTransport>(mut io: IO) -> Result<Self> {
        let arrays = query::<_, _, (u32, u32)>(
            "select oid, typelem from pg_type where typelem <> 0 and typcategory = 'A'",
            &mut io,
        )
        .fetch_all()
        .await?;

        let composite_rows = query::<_, _, (u32, u32)>(
            "select t.oid, a.atttypid \
             from pg_type t \
             join pg_class c on t.typrelid = c.oid \
             join pg_attribute a on a.attrelid = c.oid \
             where t.typtype = 'c' and a.attnum > 0 and not a.attisdropped \
             order by t.oid, a.attnum",
            &mut io,
        )
        .fetch_all()
        .await?;

        let enum_rows = query::<_, _, (u32, u32, String)>(
            "select enumtypid, oid, enumlabel from pg_enum order by enumtypid, enumsortorder",
            &mut io,
        )
        .fetch_all()
        .await?;

        let mut composites: HashMap<Oid, Vec<Oid>> = HashMap::new();
        for (type_oid, member_oid) in composite_rows {
            composites.entry(type_oid).or_default().push(member_oid);
        }

        let mut enums: HashMap<Oid, HashMap<Oid, String>> = HashMap::new();
        for (type_oid, value_oid, label) in enum_rows {
            enums.entry(type_oid).or_default().insert(value_oid, label);
        }

        Ok(Self { arrays: arrays.into_iter().collect(), composites, enums })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_resolves_nothing() {
        let reg = TypeRegistry::default();
        assert_eq!(reg.array_element(1007), None);
        assert_eq!(reg.composite_members(16_391), None);
        assert!(!reg.is_enum(16_392));
    }
}
