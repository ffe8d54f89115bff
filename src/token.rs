//! Stable asset used by the credit pool
//!
//! The pool only talks to the asset through the `Cep18Token` interface.
//! `MockStable` is a CEP-18 token with open minting for tests and devnets.
use odra::prelude::*;
use odra::casper_types::U256;
use crate::events::{Transfer, Approval};
use crate::errors::TokenError;

/// Mintable CEP-18 stable token
#[odra::module(events = [Transfer, Approval])]
pub struct MockStable {
    /// Token name
    name: Var<String>,
    /// Token symbol
    symbol: Var<String>,
    /// Token decimals
    decimals: Var<u8>,
    /// Total supply of tokens
    total_supply: Var<U256>,
    /// Balance mapping: owner -> balance
    balances: Mapping<Address, U256>,
    /// Allowance mapping: (owner, spender) -> amount
    allowances: Mapping<(Address, Address), U256>,
}

#[odra::module]
impl MockStable {
    pub fn init(&mut self, name: String, symbol: String, decimals: u8) {
        self.name.set(name);
        self.symbol.set(symbol);
        self.decimals.set(decimals);
        self.total_supply.set(U256::zero());
    }

    pub fn name(&self) -> String {
        self.name.get_or_default()
    }

    pub fn symbol(&self) -> String {
        self.symbol.get_or_default()
    }

    pub fn decimals(&self) -> u8 {
        self.decimals.get_or_default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply.get_or_default()
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(&owner).unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).unwrap_or_default()
    }

    pub fn transfer(&mut self, to: Address, amount: U256) -> bool {
        let caller = self.env().caller();
        self.transfer_internal(caller, to, amount);
        true
    }

    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        let caller = self.env().caller();
        self.approve_internal(caller, spender, amount);
        true
    }

    /// Move `amount` from `from` using the caller's allowance
    pub fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> bool {
        let caller = self.env().caller();
        let current_allowance = self.allowance(from, caller);
        if current_allowance < amount {
            self.env().revert(TokenError::InsufficientAllowance);
        }

        self.approve_internal(from, caller, current_allowance - amount);
        self.transfer_internal(from, to, amount);
        true
    }

    /// Mint to any address, open to every caller
    pub fn mint(&mut self, to: Address, amount: U256) {
        let new_supply = self
            .total_supply()
            .checked_add(amount)
            .unwrap_or_else(|| self.env().revert(TokenError::Overflow));
        self.total_supply.set(new_supply);
        self.balances.set(&to, self.balance_of(to) + amount);

        self.env().emit_event(Transfer {
            from: self.env().self_address(),
            to,
            value: amount,
        });
    }

    fn transfer_internal(&mut self, from: Address, to: Address, amount: U256) {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            self.env().revert(TokenError::InsufficientBalance);
        }

        self.balances.set(&from, from_balance - amount);
        let to_balance = self.balance_of(to);
        self.balances.set(&to, to_balance + amount);

        self.env().emit_event(Transfer {
            from,
            to,
            value: amount,
        });
    }

    fn approve_internal(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.set(&(owner, spender), amount);

        self.env().emit_event(Approval {
            owner,
            spender,
            value: amount,
        });
    }
}

/// External token interface for interacting with CEP-18 tokens
#[odra::external_contract]
pub trait Cep18Token {
    fn balance_of(&self, owner: Address) -> U256;

    fn transfer(&mut self, to: Address, amount: U256) -> bool;

    fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> bool;

    fn approve(&mut self, spender: Address, amount: U256) -> bool;

    fn allowance(&self, owner: Address, spender: Address) -> U256;
}

#[cfg(test)]
mod tests {
    use super::*;
    use odra::host::{Deployer, HostEnv};

    fn setup() -> (HostEnv, MockStableHostRef) {
        let env = odra_test::env();
        let init_args = MockStableInitArgs {
            name: String::from("Mock USD"),
            symbol: String::from("mUSD"),
            decimals: 18,
        };
        let token = MockStable::deploy(&env, init_args);
        (env, token)
    }

    #[test]
    fn test_init() {
        let (_, token) = setup();
        assert_eq!(token.name(), "Mock USD");
        assert_eq!(token.symbol(), "mUSD");
        assert_eq!(token.decimals(), 18);
        assert_eq!(token.total_supply(), U256::zero());
    }

    #[test]
    fn test_anyone_can_mint() {
        let (env, mut token) = setup();
        let user = env.get_account(3);

        env.set_caller(user);
        token.mint(user, U256::from(1000));
        assert_eq!(token.balance_of(user), U256::from(1000));
        assert_eq!(token.total_supply(), U256::from(1000));
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let (env, mut token) = setup();
        let owner = env.get_account(1);
        let spender = env.get_account(2);
        let recipient = env.get_account(3);
        token.mint(owner, U256::from(1000));

        env.set_caller(owner);
        token.approve(spender, U256::from(600));

        env.set_caller(spender);
        token.transfer_from(owner, recipient, U256::from(400));
        assert_eq!(token.balance_of(owner), U256::from(600));
        assert_eq!(token.balance_of(recipient), U256::from(400));
        assert_eq!(token.allowance(owner, spender), U256::from(200));

        assert_eq!(
            token.try_transfer_from(owner, recipient, U256::from(201)),
            Err(TokenError::InsufficientAllowance.into())
        );
    }

    #[test]
    fn test_transfer_over_balance_reverts() {
        let (env, mut token) = setup();
        let owner = env.get_account(1);
        token.mint(owner, U256::from(10));

        env.set_caller(owner);
        assert_eq!(
            token.try_transfer(env.get_account(2), U256::from(11)),
            Err(TokenError::InsufficientBalance.into())
        );
    }
}
