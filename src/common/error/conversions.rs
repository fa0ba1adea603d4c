//! Error conversion implementations.
//!
//! This module contains From trait implementations to convert from library
//! error types to the unified Error type.

use super::types::Error;

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            zip::result::ZipError::InvalidArchive(_) | zip::result::ZipError::UnsupportedArchive(_) => {
                Error::ArchiveFormat(err.to_string())
            },
            other => Error::Zip(other.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl From<serde_saphyr::Error> for Error {
    fn from(err: serde_saphyr::Error) -> Self {
        Error::Yaml(err.to_string())
    }
}

impl From<crate::template::expr::ExprError> for Error {
    fn from(err: crate::template::expr::ExprError) -> Self {
        use crate::template::expr::ExprErrorKind;

        let placeholder = err.text().to_string();
        match err.into_kind() {
            ExprErrorKind::Validation(validation) => Error::Validation(validation),
            other => Error::TemplateExpression {
                placeholder,
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_not_found_names_hash_and_extension() {
        let err = Error::ImageNotFound {
            md5: "abc".to_string(),
            extension: Some("png".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Image not found: no media entry with MD5 abc and extension 'png'"
        );

        let err = Error::ImageNotFound {
            md5: "abc".to_string(),
            extension: None,
        };
        assert_eq!(err.to_string(), "Image not found: no media entry with MD5 abc");
    }

    #[test]
    fn template_expression_names_placeholder() {
        let err = Error::template_expression("a +", "unexpected end of expression");
        assert!(err.to_string().contains("`a +`"));
    }

    #[test]
    fn filter_failures_convert_to_validation_errors() {
        let data = crate::template::value::Value::from(serde_json::json!({"x": true}));
        let expr = crate::template::expr::compile("x | limit:-1").unwrap();
        let err: Error = expr
            .evaluate(&crate::template::expr::Scope::root(&data))
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Validation(ref v) if v.filter == "limit"));

        let err: Error = crate::template::expr::compile("a +").unwrap_err().into();
        assert!(matches!(err, Error::TemplateExpression { ref placeholder, .. } if placeholder == "a +"));
    }
}
