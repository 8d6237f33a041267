/// Declare a record struct whose fields bind to result columns.
///
/// A field binds to a column through a `#[dbi = "column[,option]..."]` attribute. The first
/// token is the column name; an empty name, or no attribute, leaves the field unbound. Options:
/// `date` truncates a text field to its first 10 characters, `agg` captures the column into
/// a scratch value before storing it and then applies the same truncation. Any other field
/// attributes, doc comments included, are kept on the generated struct. Field types must
/// implement [`FromRowValue`](crate::unmarshal::FromRowValue) and the struct must be
/// `Default`.
///
/// ```rust
/// use sql_dbi::dbi_record;
///
/// dbi_record! {
///     #[derive(Debug, Default)]
///     pub struct Booking {
///         /// Primary key.
///         #[dbi = "id"]
///         pub id: i64,
///         #[dbi = "booked_at,date"]
///         pub day: String,
///         pub note: Option<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! dbi_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        $crate::__dbi_record_fields! {
            head [ $(#[$meta])* $vis struct $name ]
            done []
            attrs []
            tag []
            rest [ $($body)* ]
        }
    };
}

/// Splits the field list of [`dbi_record!`] one attribute or field at a time.
#[doc(hidden)]
#[macro_export]
macro_rules! __dbi_record_fields {
    (
        head $head:tt
        done $done:tt
        attrs $attrs:tt
        tag $previous:tt
        rest [ #[dbi = $tag:literal] $($rest:tt)* ]
    ) => {
        $crate::__dbi_record_fields! {
            head $head
            done $done
            attrs $attrs
            tag [ $tag ]
            rest [ $($rest)* ]
        }
    };
    (
        head $head:tt
        done $done:tt
        attrs [ $($attrs:tt)* ]
        tag $tag:tt
        rest [ #[$($attr:tt)*] $($rest:tt)* ]
    ) => {
        $crate::__dbi_record_fields! {
            head $head
            done $done
            attrs [ $($attrs)* #[$($attr)*] ]
            tag $tag
            rest [ $($rest)* ]
        }
    };
    (
        head $head:tt
        done [ $($done:tt)* ]
        attrs [ $($attrs:tt)* ]
        tag [ $($tag:tt)* ]
        rest [ $fvis:vis $field:ident : $ty:ty $(, $($rest:tt)*)? ]
    ) => {
        $crate::__dbi_record_fields! {
            head $head
            done [ $($done)* { [ $($attrs)* ] [ $fvis ] $field [ $ty ] [ $($tag)* ] } ]
            attrs []
            tag []
            rest [ $($($rest)*)? ]
        }
    };
    (
        head [ $(#[$meta:meta])* $vis:vis struct $name:ident ]
        done [
            $(
                {
                    [ $(#[$($fattr:tt)*])* ]
                    [ $fvis:vis ]
                    $field:ident
                    [ $ty:ty ]
                    [ $($tag:literal)? ]
                }
            )*
        ]
        attrs []
        tag []
        rest []
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$($fattr)*])*
                $fvis $field : $ty,
            )*
        }

        impl $crate::unmarshal::Record for $name {
            fn binding_table() -> ::std::result::Result<
                &'static $crate::unmarshal::BindingTable<Self>,
                $crate::DbiError,
            > {
                static TABLE: ::std::sync::OnceLock<
                    ::std::result::Result<$crate::unmarshal::BindingTable<$name>, ::std::string::String>,
                > = ::std::sync::OnceLock::new();

                fn specs() -> ::std::vec::Vec<$crate::unmarshal::FieldSpec<$name>> {
                    ::std::vec![
                        $(
                            {
                                fn store(
                                    record: &mut $name,
                                    value: $crate::RowValues,
                                ) -> ::std::result::Result<(), ::std::string::String> {
                                    record.$field =
                                        <$ty as $crate::unmarshal::FromRowValue>::from_row_value(value)?;
                                    ::std::result::Result::Ok(())
                                }

                                fn text(record: &mut $name) -> ::std::option::Option<&mut ::std::string::String> {
                                    <$ty as $crate::unmarshal::FromRowValue>::text_mut(&mut record.$field)
                                }

                                $crate::unmarshal::FieldSpec {
                                    field: ::std::stringify!($field),
                                    tag: ::std::option::Option::<&'static str>::None $( .or(::std::option::Option::Some($tag)) )?,
                                    store,
                                    text,
                                }
                            }
                        ),*
                    ]
                }

                $crate::unmarshal::BindingTable::cached(&TABLE, specs)
            }
        }
    };
}
