pub mod adva_metadata;
pub mod defaults;
pub mod locations;
pub mod metric_type;
pub mod probe_data;
pub mod probe_metadata;
pub mod reference;
pub mod reference_type;
pub mod test_metadata;
pub mod twst_metadata;

#[cfg(feature = "testing")]
pub mod testing;

/// Trait for entities whose rows can be located by business keys as well as
/// by primary key.
///
/// Each group lists the column names of one unique constraint, in
/// match-precedence order. A group can only be used to locate a row when the
/// candidate data supplies every column in it.
pub trait UniqueConstraints {
    fn unique_constraints() -> &'static [&'static [&'static str]] {
        &[]
    }
}
