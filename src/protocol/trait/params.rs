use crate::protocol::r#trait::param::Param;

/// Trait for parameter binding in prepared statements
///
/// The implementation is responsible for encoding parameters according to the
/// MySQL binary protocol layout of `COM_STMT_EXECUTE`.
pub trait Params {
    /// Number of parameters
    fn len(&self) -> usize;

    /// Check if there are no parameters
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write NULL bitmap
    ///
    /// The NULL bitmap is (num_params + 7) / 8 bytes long.
    /// Bit is set to 1 if the parameter is NULL.
    fn write_null_bitmap(&self, out: &mut Vec<u8>);

    /// Write parameter types, 2 bytes each
    fn write_types(&self, out: &mut Vec<u8>);

    /// Write parameter values, skipping NULLs
    fn write_values(&self, out: &mut Vec<u8>);
}

/// Empty parameters (no parameters)
impl Params for () {
    fn len(&self) -> usize {
        0
    }

    fn write_null_bitmap(&self, _out: &mut Vec<u8>) {}

    fn write_types(&self, _out: &mut Vec<u8>) {}

    fn write_values(&self, _out: &mut Vec<u8>) {}
}

impl Params for [Param] {
    fn len(&self) -> usize {
        <[Param]>::len(self)
    }

    fn write_null_bitmap(&self, out: &mut Vec<u8>) {
        for chunk in self.chunks(8) {
            let byte = chunk
                .iter()
                .enumerate()
                .filter(|(_, param)| param.is_null())
                .fold(0u8, |acc, (bit, _)| acc | (1 << bit));
            out.push(byte);
        }
    }

    fn write_types(&self, out: &mut Vec<u8>) {
        for param in self {
            param.encode_type(out);
        }
    }

    fn write_values(&self, out: &mut Vec<u8>) {
        for param in self {
            param.encode_value(out);
        }
    }
}

impl<P: Params + ?Sized> Params for &P {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn write_null_bitmap(&self, out: &mut Vec<u8>) {
        (**self).write_null_bitmap(out);
    }

    fn write_types(&self, out: &mut Vec<u8>) {
        (**self).write_types(out);
    }

    fn write_values(&self, out: &mut Vec<u8>) {
        (**self).write_values(out);
    }
}
