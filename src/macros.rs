#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Describe a construct whose patterns all share one builder.
///
/// ```ignore
/// construct! {
///     name: "arithmetic",
///     kind: Expression,
///     returns: "number",
///     patterns: ["%number% (1¦+|2¦-) %number%"],
///     build: |b| { ... },
/// }
/// ```
///
/// The builder sees `b: Bindings` (mutable, so operands can be taken) and
/// returns `ParseResult<Option<Node>>`. An optional
/// `fallback: |text, loader| { ... }` is tried after the patterns.
#[macro_export]
macro_rules! construct {
    (
        name: $name:expr,
        kind: $kind:ident,
        returns: $returns:expr,
        patterns: [ $($pat:expr),* $(,)? ],
        build: |$b:ident| $body:block
        $(, fallback: |$text:ident, $loader:ident| $fb:block)?
        $(,)?
    ) => {{
        let build: $crate::Builder = std::sync::Arc::new(
            move |#[allow(unused_mut)] mut $b: $crate::Bindings<'_>| -> $crate::ParseResult<Option<$crate::Node>> { $body },
        );
        #[allow(unused_mut)]
        let mut spec = $crate::ConstructSpec::new($name, $crate::ConstructKind::$kind, $returns);
        $( spec = spec.syntax($pat, build.clone()); )*
        $(
            let fallback: $crate::Fallback = std::sync::Arc::new(
                move |$text: &str, $loader: &mut $crate::Loader<'_>| -> $crate::ParseResult<Option<$crate::Node>> { $fb },
            );
            spec = spec.fallback(fallback);
        )?
        spec
    }};
}
