use super::combinators::*;
use super::core::Parser;

pub fn satisfy<I, O, F>(f: F) -> Satisfy<I, O, F>
where
    F: Fn(&I) -> Option<O>,
{
    Satisfy::new(f)
}

pub fn preceded<P1, P2, I, O>(parser1: P1, parser2: P2) -> Preceded<P1, P2, I, O>
where
    P1: Parser<I, ()>,
    P2: Parser<I, O>,
{
    Preceded::new(parser1, parser2)
}

pub fn map<P, F, A, B, I>(parser: P, f: F) -> Map<P, F, A, B>
where
    P: Parser<I, A>,
    F: Fn(A) -> B,
{
    Map::new(parser, f)
}

pub fn as_unit<I, O, P>(parser: P) -> AsUnit<P, O>
where
    P: Parser<I, O>,
{
    AsUnit::new(parser)
}

pub fn many<P, I, O>(parser: P) -> Many<P, I, O>
where
    P: Parser<I, O>,
{
    Many::new(parser)
}

pub fn with_context<P, I, O, C>(parser: P, c: C) -> WithContext<P, C>
where
    P: Parser<I, O>,
{
    WithContext::new(parser, c)
}
