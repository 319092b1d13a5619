//! Arena indices into [`crate::SqlSchema`]. Each entity lives in a flat
//! `Vec` on the schema and is addressed by a small `Copy` id rather than a
//! reference, so walkers (see [`crate::walkers`]) can be passed around and
//! compared cheaply without lifetimes tangling into the differ.

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

id_type!(SchemaId);
id_type!(TableId);
id_type!(ColumnId);
id_type!(IndexId);
id_type!(ForeignKeyId);
id_type!(CheckId);
id_type!(EnumId);
id_type!(SequenceId);
