//! The SPARQL hash builtins: lowercase hex digests of the literal content.

use super::value::{ExprResult, Value};
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

pub(super) fn md5(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    let digest = hex::encode(Md5::new().chain_update(content.as_bytes()).finalize());
    Ok(Value::simple_string(&digest))
}

pub(super) fn sha1(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    let digest = hex::encode(Sha1::new().chain_update(content.as_bytes()).finalize());
    Ok(Value::simple_string(&digest))
}

pub(super) fn sha256(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    let digest = hex::encode(Sha256::new().chain_update(content.as_bytes()).finalize());
    Ok(Value::simple_string(&digest))
}

pub(super) fn sha384(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    let digest = hex::encode(Sha384::new().chain_update(content.as_bytes()).finalize());
    Ok(Value::simple_string(&digest))
}

pub(super) fn sha512(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    let digest = hex::encode(Sha512::new().chain_update(content.as_bytes()).finalize());
    Ok(Value::simple_string(&digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        let abc = Value::simple_string("abc");
        assert_eq!(
            md5(&abc).unwrap(),
            Value::simple_string("900150983cd24fb0d6963f7d28e17f72")
        );
        assert_eq!(
            sha1(&abc).unwrap(),
            Value::simple_string("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert_eq!(
            sha256(&abc).unwrap(),
            Value::simple_string(
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
            )
        );
    }
}
