//! The curated primitive library, grouped one module per
//! category. `register_all` is the sole entry point `Interpreter`
//! bootstrapping calls; `register_all_help` feeds the `(help)` builtin.

pub mod arithmetic;
pub mod control;
pub mod help;
pub mod higher_order;
pub mod lists;
pub mod maps;
pub mod predicates;
pub mod printing;
pub mod support;
pub mod symbols;
pub mod strings;

pub fn register_all(globals: &crate::env::Globals) {
    arithmetic::register(globals);
    control::register(globals);
    help::register(globals);
    higher_order::register(globals);
    lists::register(globals);
    maps::register(globals);
    predicates::register(globals);
    printing::register(globals);
    symbols::register(globals);
    strings::register(globals);
}

pub fn register_all_help() {
    arithmetic::register_help();
    control::register_help();
    help::register_help();
    higher_order::register_help();
    lists::register_help();
    maps::register_help();
    predicates::register_help();
    printing::register_help();
    symbols::register_help();
    strings::register_help();
}
