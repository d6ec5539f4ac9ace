//! Image operations
//!
//! Declared variant operations are plain `name + arguments` records. Before any
//! image is loaded they are parsed through a lookup table into the closed set of
//! [`ImageOperation`]s; unknown names and malformed argument bags are rejected
//! here.

use serde_json::Value;
use stowage_core::{Arguments, Error, FlipDirection, Operation, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOperation {
    /// Scale to `width` x `height`, keeping proportions inside that box when
    /// `aspect_ratio` is set
    Resize {
        width: u32,
        height: u32,
        aspect_ratio: bool,
        prevent_upscale: bool,
    },
    /// Crop and scale to fill exactly `width` x `height`
    Fit {
        width: u32,
        height: u32,
        prevent_upscale: bool,
    },
    /// Cut out a region; a missing anchor centers it on that axis
    Crop {
        width: u32,
        height: u32,
        x: Option<u32>,
        y: Option<u32>,
    },
    Flip(FlipDirection),
}

type Parser = fn(&Arguments) -> Result<ImageOperation>;

const OPERATIONS: &[(&str, Parser)] = &[
    ("resize", parse_resize),
    ("fit", parse_fit),
    ("crop", parse_crop),
    ("flip", parse_flip),
    ("flipHorizontal", parse_flip_horizontal),
    ("flipVertical", parse_flip_vertical),
];

/// Names accepted in variant declarations
pub fn supported_operations() -> impl Iterator<Item = &'static str> {
    OPERATIONS.iter().map(|(name, _)| *name)
}

impl ImageOperation {
    pub fn from_operation(operation: &Operation) -> Result<Self> {
        let parse = OPERATIONS
            .iter()
            .find(|(name, _)| *name == operation.name)
            .map(|(_, parse)| parse)
            .ok_or_else(|| Error::UnsupportedOperation(operation.name.clone()))?;

        parse(&operation.arguments)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ImageOperation::Resize { .. } => "resize",
            ImageOperation::Fit { .. } => "fit",
            ImageOperation::Crop { .. } => "crop",
            ImageOperation::Flip(_) => "flip",
        }
    }
}

impl TryFrom<&Operation> for ImageOperation {
    type Error = Error;

    fn try_from(operation: &Operation) -> Result<Self> {
        Self::from_operation(operation)
    }
}

fn parse_resize(args: &Arguments) -> Result<ImageOperation> {
    Ok(ImageOperation::Resize {
        width: dimension(args, "resize", "width")?,
        height: dimension(args, "resize", "height")?,
        aspect_ratio: flag(args, "aspectRatio", true)?,
        prevent_upscale: flag(args, "preventUpscale", false)?,
    })
}

fn parse_fit(args: &Arguments) -> Result<ImageOperation> {
    let width = dimension(args, "fit", "width")?;
    let height = match optional_u32(args, "height")? {
        Some(0) => return Err(zero_dimension("fit", "height")),
        Some(height) => height,
        None => width,
    };

    Ok(ImageOperation::Fit {
        width,
        height,
        prevent_upscale: flag(args, "preventUpscale", false)?,
    })
}

fn parse_crop(args: &Arguments) -> Result<ImageOperation> {
    Ok(ImageOperation::Crop {
        width: dimension(args, "crop", "width")?,
        height: dimension(args, "crop", "height")?,
        x: optional_u32(args, "x")?,
        y: optional_u32(args, "y")?,
    })
}

fn parse_flip(args: &Arguments) -> Result<ImageOperation> {
    let direction = args
        .get("direction")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidArgument("flip requires a `direction`".to_string()))?;

    Ok(ImageOperation::Flip(direction.parse()?))
}

fn parse_flip_horizontal(_: &Arguments) -> Result<ImageOperation> {
    Ok(ImageOperation::Flip(FlipDirection::Horizontal))
}

fn parse_flip_vertical(_: &Arguments) -> Result<ImageOperation> {
    Ok(ImageOperation::Flip(FlipDirection::Vertical))
}

fn dimension(args: &Arguments, operation: &str, key: &str) -> Result<u32> {
    match optional_u32(args, key)? {
        Some(0) => Err(zero_dimension(operation, key)),
        Some(value) => Ok(value),
        None => Err(Error::InvalidArgument(format!(
            "{} requires `{}`",
            operation, key
        ))),
    }
}

fn zero_dimension(operation: &str, key: &str) -> Error {
    Error::InvalidArgument(format!("{} `{}` must be greater than zero", operation, key))
}

/// Integers may also be given as numeric strings; `null` counts as missing.
fn optional_u32(args: &Arguments, key: &str) -> Result<Option<u32>> {
    let invalid = || Error::InvalidArgument(format!("`{}` must be a non-negative integer", key));

    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            let n = n.as_u64().ok_or_else(invalid)?;
            u32::try_from(n).map(Some).map_err(|_| invalid())
        }
        Some(Value::String(s)) => s.trim().parse::<u32>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn flag(args: &Arguments, key: &str, default: bool) -> Result<bool> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(Error::InvalidArgument(format!("`{}` must be a boolean", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn operation(name: &str, arguments: Value) -> Operation {
        match arguments {
            Value::Object(map) => Operation::new(name, map),
            _ => Operation::new(name, Arguments::new()),
        }
    }

    #[test]
    fn test_resize_defaults() {
        let op = operation("resize", json!({"width": 300, "height": "200"}));
        assert_eq!(
            ImageOperation::from_operation(&op).unwrap(),
            ImageOperation::Resize {
                width: 300,
                height: 200,
                aspect_ratio: true,
                prevent_upscale: false,
            }
        );
    }

    #[test]
    fn test_fit_height_defaults_to_width() {
        let op = operation("fit", json!({"width": 120}));
        assert_eq!(
            ImageOperation::try_from(&op).unwrap(),
            ImageOperation::Fit {
                width: 120,
                height: 120,
                prevent_upscale: false,
            }
        );
    }

    #[test]
    fn test_crop_anchor_is_optional() {
        let op = operation("crop", json!({"width": 10, "height": 20, "x": null, "y": 5}));
        assert_eq!(
            ImageOperation::from_operation(&op).unwrap(),
            ImageOperation::Crop {
                width: 10,
                height: 20,
                x: None,
                y: Some(5),
            }
        );
    }

    #[test]
    fn test_flip_directions() {
        let op = operation("flip", json!({"direction": "v"}));
        assert_eq!(
            ImageOperation::from_operation(&op).unwrap(),
            ImageOperation::Flip(FlipDirection::Vertical)
        );

        let op = operation("flipHorizontal", json!({}));
        assert_eq!(
            ImageOperation::from_operation(&op).unwrap(),
            ImageOperation::Flip(FlipDirection::Horizontal)
        );

        let op = operation("flip", json!({"direction": "x"}));
        assert!(matches!(
            ImageOperation::from_operation(&op),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_malformed_arguments() {
        for (name, args) in [
            ("resize", json!({"width": 10})),
            ("resize", json!({"width": 10, "height": -4})),
            ("resize", json!({"width": 10, "height": 10, "aspectRatio": "yes"})),
            ("crop", json!({"width": 0, "height": 10})),
            ("fit", json!({})),
            ("flip", json!({})),
        ] {
            let result = ImageOperation::from_operation(&operation(name, args));
            assert!(matches!(result, Err(Error::InvalidArgument(_))), "{}", name);
        }
    }

    #[test]
    fn test_unknown_operation() {
        let op = operation("rotate", json!({"angle": 90}));
        assert!(matches!(
            ImageOperation::from_operation(&op),
            Err(Error::UnsupportedOperation(name)) if name == "rotate"
        ));
        assert!(supported_operations().any(|name| name == "flipVertical"));
    }
}
