/// Creates a `GssError` with `DefectiveToken` kind
///
/// Shorthand for
/// ```rust
/// <krb5_gss::GssError as krb5_gss::GssErrorExt>::defective_token(context)
/// ```
#[macro_export]
macro_rules! defective_token_err {
    ( $context:expr $(,)? ) => {{
        <$crate::GssError as $crate::GssErrorExt>::defective_token($context)
    }};
}

/// Creates a `GssError` with `BadMic` kind
///
/// Shorthand for
/// ```rust
/// <krb5_gss::GssError as krb5_gss::GssErrorExt>::bad_mic(context)
/// ```
#[macro_export]
macro_rules! bad_mic_err {
    ( $context:expr $(,)? ) => {{
        <$crate::GssError as $crate::GssErrorExt>::bad_mic($context)
    }};
}

/// Creates a `GssError` with `UnsupportedAlgorithm` kind
///
/// Shorthand for
/// ```rust
/// <krb5_gss::GssError as krb5_gss::GssErrorExt>::unsupported_algorithm(context)
/// ```
#[macro_export]
macro_rules! unsupported_err {
    ( $context:expr $(,)? ) => {{
        <$crate::GssError as $crate::GssErrorExt>::unsupported_algorithm($context)
    }};
}

/// Creates a `GssError` with `Failure` kind and a source error attached to it
///
/// Shorthand for
/// ```rust
/// <krb5_gss::GssError as krb5_gss::GssErrorExt>::custom(context, source)
/// ```
#[macro_export]
macro_rules! custom_err {
    ( $context:expr, $source:expr $(,)? ) => {{
        <$crate::GssError as $crate::GssErrorExt>::custom($context, $source)
    }};
}
