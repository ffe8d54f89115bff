//! Binary for building WASM contracts from odra modules.
#![doc = "Binary for building WASM contracts from odra modules."]

#[allow(unused_imports)]
use attested_credit;

fn main() {
    // Compilation is driven by odra-build, see Odra.toml for the contract list
}
