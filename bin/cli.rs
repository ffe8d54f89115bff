//! CLI tool for deploying and operating the attested credit contracts.

use attested_credit::credit::oracle::{CreditOracle, HostSigner, OracleConfig};
use attested_credit::credit::pool::CreditPool;
use attested_credit::credit::registry::CreditRegistry;
use attested_credit::token::MockStable;
use odra::casper_types::U256;
use odra::host::HostEnv;
use odra::OdraError;
use odra::prelude::{Address, Addressable};
use odra::schema::casper_contract_schema::NamedCLType;
use odra_cli::{
    deploy::DeployScript,
    scenario::{Args, Error, Scenario, ScenarioMetadata},
    CommandArg, ContractProvider, DeployedContractsContainer, DeployerExt,
    OdraCli,
};
use tracing_subscriber::EnvFilter;

/// Chain id bound into attestations when deploying the registry
const DEFAULT_CHAIN_ID: u64 = 1;

/// Deploys the MockStable asset.
pub struct StableDeployScript;

impl DeployScript for StableDeployScript {
    fn deploy(
        &self,
        env: &HostEnv,
        container: &mut DeployedContractsContainer
    ) -> Result<(), odra_cli::deploy::Error> {
        use attested_credit::token::MockStableInitArgs;

        let _stable = MockStable::load_or_deploy(
            &env,
            MockStableInitArgs {
                name: String::from("Mock USD"),
                symbol: String::from("mUSD"),
                decimals: 18,
            },
            container,
            300_000_000_000
        )?;

        Ok(())
    }
}

/// Deploys the CreditRegistry with the deployer's key as attester.
pub struct RegistryDeployScript;

impl DeployScript for RegistryDeployScript {
    fn deploy(
        &self,
        env: &HostEnv,
        container: &mut DeployedContractsContainer
    ) -> Result<(), odra_cli::deploy::Error> {
        use attested_credit::credit::registry::CreditRegistryInitArgs;

        let caller = env.caller();
        let _registry = CreditRegistry::load_or_deploy(
            &env,
            CreditRegistryInitArgs {
                attester: env.public_key(&caller),
                chain_id: DEFAULT_CHAIN_ID,
            },
            container,
            400_000_000_000
        )?;

        Ok(())
    }
}

/// Deploys the CreditPool.
/// Requires the asset and the registry to be deployed first.
pub struct PoolDeployScript;

impl DeployScript for PoolDeployScript {
    fn deploy(
        &self,
        env: &HostEnv,
        container: &mut DeployedContractsContainer
    ) -> Result<(), odra_cli::deploy::Error> {
        use attested_credit::credit::pool::CreditPoolInitArgs;

        let stable = container.contract_ref::<MockStable>(env)?;
        let registry = container.contract_ref::<CreditRegistry>(env)?;

        let _pool = CreditPool::load_or_deploy(
            &env,
            CreditPoolInitArgs {
                asset: stable.address().clone(),
                registry: registry.address().clone(),
            },
            container,
            600_000_000_000
        )?;

        Ok(())
    }
}

/// Deploys the complete protocol (asset + registry + pool).
pub struct ProtocolDeployScript;

impl DeployScript for ProtocolDeployScript {
    fn deploy(
        &self,
        env: &HostEnv,
        container: &mut DeployedContractsContainer
    ) -> Result<(), odra_cli::deploy::Error> {
        StableDeployScript.deploy(env, container)?;
        RegistryDeployScript.deploy(env, container)?;
        PoolDeployScript.deploy(env, container)?;

        Ok(())
    }
}

/// Scenario to sign and register a credit limit.
/// The caller must be the registry's attester.
pub struct IssueLimitScenario;

impl Scenario for IssueLimitScenario {
    fn args(&self) -> Vec<CommandArg> {
        vec![
            CommandArg::new(
                "user",
                "Address receiving the credit line",
                NamedCLType::Key,
            ),
            CommandArg::new(
                "score",
                "Score reported by the scoring backend",
                NamedCLType::U32,
            ),
            CommandArg::new(
                "limit",
                "Credit limit in asset units",
                NamedCLType::U256,
            ),
        ]
    }

    fn run(
        &self,
        env: &HostEnv,
        container: &DeployedContractsContainer,
        args: Args
    ) -> Result<(), Error> {
        let mut registry = container.contract_ref::<CreditRegistry>(env)?;
        let user = args.get_single::<Address>("user")?;
        let score = args.get_single::<u32>("score")?;
        let limit = args.get_single::<U256>("limit")?;

        let config = OracleConfig::new(registry.chain_id(), registry.address().clone());
        let signed = {
            let oracle = CreditOracle::new(
                config,
                HostSigner::new(env.clone(), env.caller()),
                &registry,
                env.clone(),
            );
            oracle.create_attestation(user, score, limit).map_err(|error| {
                tracing::error!(%error, ?user, "attestation not issued");
                OdraError::from(error)
            })?
        };

        env.set_gas(100_000_000_000);
        registry.try_register_limit(signed.attestation.clone(), signed.signature)?;

        tracing::info!(
            ?user,
            nonce = signed.attestation.nonce,
            expiry = signed.attestation.expiry,
            "credit limit registered"
        );
        Ok(())
    }
}

impl ScenarioMetadata for IssueLimitScenario {
    const NAME: &'static str = "issue-limit";
    const DESCRIPTION: &'static str = "Signs a credit limit for a user and registers it";
}

/// Scenario to mint test asset and deposit it into the pool.
pub struct DepositScenario;

impl Scenario for DepositScenario {
    fn args(&self) -> Vec<CommandArg> {
        vec![CommandArg::new(
            "amount",
            "Amount of the asset to deposit",
            NamedCLType::U256,
        )]
    }

    fn run(
        &self,
        env: &HostEnv,
        container: &DeployedContractsContainer,
        args: Args
    ) -> Result<(), Error> {
        let mut stable = container.contract_ref::<MockStable>(env)?;
        let mut pool = container.contract_ref::<CreditPool>(env)?;
        let amount = args.get_single::<U256>("amount")?;
        let caller = env.caller();

        env.set_gas(50_000_000_000);
        stable.try_mint(caller, amount)?;
        stable.try_approve(pool.address().clone(), amount)?;

        env.set_gas(150_000_000_000);
        let shares = pool.try_deposit(amount)?;

        tracing::info!(%amount, %shares, "deposited into the credit pool");
        Ok(())
    }
}

impl ScenarioMetadata for DepositScenario {
    const NAME: &'static str = "deposit";
    const DESCRIPTION: &'static str = "Mints test asset and deposits it into the credit pool";
}

/// Scenario to accrue pool interest up to the current block.
pub struct AccrueScenario;

impl Scenario for AccrueScenario {
    fn args(&self) -> Vec<CommandArg> {
        vec![]
    }

    fn run(
        &self,
        env: &HostEnv,
        container: &DeployedContractsContainer,
        _args: Args
    ) -> Result<(), Error> {
        let mut pool = container.contract_ref::<CreditPool>(env)?;

        env.set_gas(100_000_000_000);
        let report = pool.try_accrue()?;

        tracing::info!(
            rate = %report.rate,
            interest = %report.interest,
            reserve_cut = %report.reserve_cut,
            borrow_index = %report.borrow_index,
            "interest accrued"
        );
        Ok(())
    }
}

impl ScenarioMetadata for AccrueScenario {
    const NAME: &'static str = "accrue";
    const DESCRIPTION: &'static str = "Accrues pool interest up to the current block time";
}

/// Main function to run the CLI tool.
pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    OdraCli::new()
        .about("CLI tool for the attested credit contracts")
        // Deploy scripts
        .deploy(StableDeployScript)
        .deploy(RegistryDeployScript)
        .deploy(PoolDeployScript)
        .deploy(ProtocolDeployScript)
        // Contract references
        .contract::<MockStable>()
        .contract::<CreditRegistry>()
        .contract::<CreditPool>()
        // Scenarios
        .scenario(IssueLimitScenario)
        .scenario(DepositScenario)
        .scenario(AccrueScenario)
        .build()
        .run();
}
