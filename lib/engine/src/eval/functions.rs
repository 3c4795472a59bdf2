//! The builtin function dispatcher.

use super::value::{ExprError, ExprResult, Value};
use super::{cast, datetime, hash, numeric, strings, terms, EvalContext};
use crate::lexical::expand_prefixed;

/// Calls a builtin by its surface name (case-insensitive; prefixed names
/// are expanded and retried as casts).
pub(super) fn call(
    name: &str,
    args: Vec<ExprResult<Value>>,
    ctx: &EvalContext<'_>,
) -> ExprResult<Value> {
    let lowered = name.to_ascii_lowercase();
    match lowered.as_str() {
        // Functional forms.
        "if" => {
            require(&args, 3)?;
            let condition = arg(&args, 0)?;
            let chosen = if condition.effective_boolean() { 1 } else { 2 };
            args.into_iter().nth(chosen).unwrap_or(Err(ExprError))
        }
        "coalesce" => args
            .into_iter()
            .find_map(|candidate| match candidate {
                Ok(value) if !value.is_unbound() => Some(Ok(value)),
                _ => None,
            })
            .unwrap_or(Err(ExprError)),

        // Term kind.
        "bound" => {
            require(&args, 1)?;
            Ok(terms::bound(arg(&args, 0)?))
        }
        "isiri" | "isuri" => {
            require(&args, 1)?;
            terms::is_iri(arg(&args, 0)?)
        }
        "isblank" => {
            require(&args, 1)?;
            terms::is_blank(arg(&args, 0)?)
        }
        "isliteral" => {
            require(&args, 1)?;
            terms::is_literal(arg(&args, 0)?)
        }
        "isnumeric" => {
            require(&args, 1)?;
            terms::is_numeric(arg(&args, 0)?)
        }
        "sameterm" => {
            require(&args, 2)?;
            terms::same_term(arg(&args, 0)?, arg(&args, 1)?)
        }
        "datatype" => {
            require(&args, 1)?;
            terms::datatype(arg(&args, 0)?)
        }
        "lang" => {
            require(&args, 1)?;
            terms::lang(arg(&args, 0)?)
        }
        "langmatches" => {
            require(&args, 2)?;
            strings::lang_matches(arg(&args, 0)?, arg(&args, 1)?)
        }

        // Strings.
        "str" => {
            require(&args, 1)?;
            terms::str_fn(arg(&args, 0)?)
        }
        "strlen" => {
            require(&args, 1)?;
            strings::strlen(arg(&args, 0)?)
        }
        "ucase" => {
            require(&args, 1)?;
            strings::ucase(arg(&args, 0)?)
        }
        "lcase" => {
            require(&args, 1)?;
            strings::lcase(arg(&args, 0)?)
        }
        "substr" => {
            if args.len() == 2 {
                strings::substr(arg(&args, 0)?, arg(&args, 1)?, None)
            } else {
                require(&args, 3)?;
                strings::substr(arg(&args, 0)?, arg(&args, 1)?, Some(arg(&args, 2)?))
            }
        }
        "concat" => strings::concat(&args),
        "contains" => {
            require(&args, 2)?;
            strings::contains(arg(&args, 0)?, arg(&args, 1)?)
        }
        "strstarts" => {
            require(&args, 2)?;
            strings::strstarts(arg(&args, 0)?, arg(&args, 1)?)
        }
        "strends" => {
            require(&args, 2)?;
            strings::strends(arg(&args, 0)?, arg(&args, 1)?)
        }
        "strbefore" => {
            require(&args, 2)?;
            strings::strbefore(arg(&args, 0)?, arg(&args, 1)?)
        }
        "strafter" => {
            require(&args, 2)?;
            strings::strafter(arg(&args, 0)?, arg(&args, 1)?)
        }
        "encode_for_uri" => {
            require(&args, 1)?;
            strings::encode_for_uri(arg(&args, 0)?)
        }
        "regex" => {
            if args.len() == 2 {
                strings::regex_match(arg(&args, 0)?, arg(&args, 1)?, None)
            } else {
                require(&args, 3)?;
                strings::regex_match(arg(&args, 0)?, arg(&args, 1)?, Some(arg(&args, 2)?))
            }
        }
        "replace" => {
            if args.len() == 3 {
                strings::replace(arg(&args, 0)?, arg(&args, 1)?, arg(&args, 2)?, None)
            } else {
                require(&args, 4)?;
                strings::replace(
                    arg(&args, 0)?,
                    arg(&args, 1)?,
                    arg(&args, 2)?,
                    Some(arg(&args, 3)?),
                )
            }
        }
        "text:match" => {
            require(&args, 2)?;
            strings::text_match(arg(&args, 0)?, arg(&args, 1)?)
        }

        // Constructors.
        "iri" | "uri" => {
            require(&args, 1)?;
            terms::iri(arg(&args, 0)?, ctx.base)
        }
        "bnode" => {
            if args.is_empty() {
                terms::bnode(None)
            } else {
                require(&args, 1)?;
                terms::bnode(Some(arg(&args, 0)?))
            }
        }
        "strdt" => {
            require(&args, 2)?;
            terms::strdt(arg(&args, 0)?, arg(&args, 1)?)
        }
        "strlang" => {
            require(&args, 2)?;
            terms::strlang(arg(&args, 0)?, arg(&args, 1)?)
        }
        "uuid" => {
            require(&args, 0)?;
            Ok(terms::uuid())
        }
        "struuid" => {
            require(&args, 0)?;
            Ok(terms::struuid())
        }

        // Numerics.
        "abs" => {
            require(&args, 1)?;
            numeric::abs(arg(&args, 0)?)
        }
        "round" => {
            require(&args, 1)?;
            numeric::round(arg(&args, 0)?)
        }
        "ceil" => {
            require(&args, 1)?;
            numeric::ceil(arg(&args, 0)?)
        }
        "floor" => {
            require(&args, 1)?;
            numeric::floor(arg(&args, 0)?)
        }
        "rand" => {
            require(&args, 0)?;
            Ok(numeric::rand())
        }

        // Dates and times.
        "now" => {
            require(&args, 0)?;
            datetime::now()
        }
        "year" => {
            require(&args, 1)?;
            datetime::year(arg(&args, 0)?)
        }
        "month" => {
            require(&args, 1)?;
            datetime::month(arg(&args, 0)?)
        }
        "day" => {
            require(&args, 1)?;
            datetime::day(arg(&args, 0)?)
        }
        "hours" => {
            require(&args, 1)?;
            datetime::hours(arg(&args, 0)?)
        }
        "minutes" => {
            require(&args, 1)?;
            datetime::minutes(arg(&args, 0)?)
        }
        "seconds" => {
            require(&args, 1)?;
            datetime::seconds(arg(&args, 0)?)
        }
        "tz" => {
            require(&args, 1)?;
            datetime::tz(arg(&args, 0)?)
        }
        "timezone" => {
            require(&args, 1)?;
            datetime::timezone(arg(&args, 0)?)
        }

        // Hashes.
        "md5" => {
            require(&args, 1)?;
            hash::md5(arg(&args, 0)?)
        }
        "sha1" => {
            require(&args, 1)?;
            hash::sha1(arg(&args, 0)?)
        }
        "sha256" => {
            require(&args, 1)?;
            hash::sha256(arg(&args, 0)?)
        }
        "sha384" => {
            require(&args, 1)?;
            hash::sha384(arg(&args, 0)?)
        }
        "sha512" => {
            require(&args, 1)?;
            hash::sha512(arg(&args, 0)?)
        }

        // Anything else: a prefixed name might still be a cast.
        _ if name.contains(':') => {
            let iri = expand_prefixed(name, ctx.prefixes).ok_or(ExprError)?;
            call_iri(&iri, args, ctx)
        }
        _ => Err(ExprError),
    }
}

/// Calls a function referenced by full IRI; only the XSD constructors are
/// recognized here.
pub(super) fn call_iri(
    iri: &str,
    args: Vec<ExprResult<Value>>,
    _ctx: &EvalContext<'_>,
) -> ExprResult<Value> {
    require(&args, 1)?;
    let value = arg(&args, 0)?;
    cast::cast_by_iri(iri, value).unwrap_or(Err(ExprError))
}

fn require(args: &[ExprResult<Value>], arity: usize) -> ExprResult<()> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(ExprError)
    }
}

fn arg<'a>(args: &'a [ExprResult<Value>], index: usize) -> ExprResult<&'a Value> {
    match args.get(index) {
        Some(Ok(value)) => Ok(value),
        _ => Err(ExprError),
    }
}
