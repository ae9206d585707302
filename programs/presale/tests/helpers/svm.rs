use std::rc::Rc;

use anchor_client::solana_sdk::instruction::{AccountMeta, Instruction, InstructionError};
use anchor_client::solana_sdk::message::{Message, VersionedMessage};
use anchor_client::solana_sdk::program_pack::Pack;
use anchor_client::solana_sdk::pubkey::Pubkey;
use anchor_client::solana_sdk::signature::Keypair;
use anchor_client::solana_sdk::signer::Signer;
use anchor_client::solana_sdk::system_instruction::create_account;
use anchor_client::solana_sdk::transaction::{TransactionError, VersionedTransaction};
use anchor_lang::error::ERROR_CODE_OFFSET;
use anchor_lang::prelude::{Clock, Rent};
use anchor_lang::{AccountDeserialize, InstructionData, ToAccountMetas};
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::associated_token::spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use anchor_spl::token::{spl_token, TokenAccount};
use litesvm::LiteSVM;
use presale::errors::PresaleError;
use presale::pda::{
    derive_custody_token_account, derive_presale_info, derive_presale_vault, derive_user_info,
};
use presale::state::{PresaleInfo, PresaleParams, UserInfo};

use super::{DEPOSIT_AMOUNT, LAMPORTS_PER_SOL};

/// Window start on the validator clock; whole seconds so the sysvar can hit it.
pub const SVM_START_TIME: u64 = 1_717_497_786_000;
pub const SVM_END_TIME: u64 = SVM_START_TIME + 5_000;

pub trait LiteSVMExt {
    fn get_deserialized_account<T: AccountDeserialize>(&self, pubkey: &Pubkey) -> Option<T>;
}

impl LiteSVMExt for LiteSVM {
    fn get_deserialized_account<T: AccountDeserialize>(&self, pubkey: &Pubkey) -> Option<T> {
        let account = self.get_account(pubkey)?;
        T::try_deserialize(&mut account.data.as_ref()).ok()
    }
}

fn read_program() -> Option<Vec<u8>> {
    let program_path = format!(
        "{}/../../target/deploy/presale.so",
        env!("CARGO_MANIFEST_DIR")
    );
    match std::fs::read(&program_path) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            eprintln!(
                "skipping: {} not readable ({}), run `anchor build` first",
                program_path, err
            );
            None
        }
    }
}

pub fn process_transaction(
    lite_svm: &mut LiteSVM,
    instructions: &[Instruction],
    payer: &Pubkey,
    signers: &[&Keypair],
) -> Result<(), TransactionError> {
    let blockhash = lite_svm.latest_blockhash();
    let msg = Message::new_with_blockhash(instructions, Some(payer), &blockhash);
    let tx = VersionedTransaction::try_new(VersionedMessage::Legacy(msg), signers).unwrap();

    let result = lite_svm
        .send_transaction(tx)
        .map(drop)
        .map_err(|failed| failed.err);
    // identical retries must not be deduplicated as already processed
    lite_svm.expire_blockhash();
    result
}

pub fn assert_program_error(result: Result<(), TransactionError>, expected: PresaleError) {
    match result {
        Err(TransactionError::InstructionError(_, InstructionError::Custom(code))) => {
            assert_eq!(
                code,
                ERROR_CODE_OFFSET + expected as u32,
                "expected {:?}",
                expected
            );
        }
        other => panic!("expected {:?}, got {:?}", expected, other),
    }
}

/// The compiled program running inside litesvm, with a funded authority that holds
/// the whole supply of a fresh mint.
pub struct SvmContext {
    pub lite_svm: LiteSVM,
    pub authority: Rc<Keypair>,
    pub token_mint: Rc<Keypair>,
}

impl SvmContext {
    /// `None` when the program has not been built into `target/deploy`.
    pub fn initialize() -> Option<Self> {
        let program_bytes = read_program()?;
        let mut svm = LiteSVM::new();
        let _ = svm.add_program(presale::ID, &program_bytes);

        let authority = Keypair::new();
        svm.airdrop(&authority.pubkey(), 100 * LAMPORTS_PER_SOL)
            .expect("Failed to airdrop SOL to authority");

        let mut context = Self {
            lite_svm: svm,
            authority: Rc::new(authority),
            token_mint: Rc::new(Keypair::new()),
        };
        context.warp_to_millis(SVM_START_TIME - 1_000);
        context.create_mint(9);
        context.mint_to_authority(DEPOSIT_AMOUNT);
        Some(context)
    }

    pub fn funded_keypair(&mut self, lamports: u64) -> Keypair {
        let keypair = Keypair::new();
        self.lite_svm
            .airdrop(&keypair.pubkey(), lamports)
            .expect("Failed to airdrop SOL");
        keypair
    }

    pub fn warp_to_millis(&mut self, millis: u64) {
        let mut clock: Clock = self.lite_svm.get_sysvar();
        clock.unix_timestamp = (millis / 1_000) as i64;
        self.lite_svm.set_sysvar(&clock);
    }

    pub fn reserve_floor(&self) -> u64 {
        self.lite_svm.get_sysvar::<Rent>().minimum_balance(0)
    }

    fn create_mint(&mut self, decimals: u8) {
        let payer = self.authority.pubkey();
        let mint = self.token_mint.pubkey();
        let space = spl_token::state::Mint::LEN;
        let lamports = self.lite_svm.get_sysvar::<Rent>().minimum_balance(space);

        let create_account_ix =
            create_account(&payer, &mint, lamports, space as u64, &spl_token::ID);
        let initialize_mint_ix =
            spl_token::instruction::initialize_mint(&spl_token::ID, &mint, &payer, None, decimals)
                .expect("Failed to create initialize_mint instruction");

        process_transaction(
            &mut self.lite_svm,
            &[create_account_ix, initialize_mint_ix],
            &payer,
            &[self.authority.as_ref(), self.token_mint.as_ref()],
        )
        .unwrap();
    }

    fn mint_to_authority(&mut self, amount: u64) {
        let authority = self.authority.pubkey();
        let mint = self.token_mint.pubkey();
        let destination = get_associated_token_address(&authority, &mint);

        let create_ata_ix =
            create_associated_token_account_idempotent(&authority, &authority, &mint, &spl_token::ID);
        let mint_to_ix = spl_token::instruction::mint_to(
            &spl_token::ID,
            &mint,
            &destination,
            &authority,
            &[],
            amount,
        )
        .expect("Failed to create mint_to instruction");

        process_transaction(
            &mut self.lite_svm,
            &[create_ata_ix, mint_to_ix],
            &authority,
            &[self.authority.as_ref()],
        )
        .unwrap();
    }

    pub fn presale_info_address(&self) -> Pubkey {
        derive_presale_info(&presale::ID).0
    }

    pub fn vault_address(&self) -> Pubkey {
        derive_presale_vault(&presale::ID).0
    }

    pub fn custody_address(&self) -> Pubkey {
        derive_custody_token_account(&self.token_mint.pubkey(), &presale::ID)
    }

    pub fn presale_info(&self) -> PresaleInfo {
        self.lite_svm
            .get_deserialized_account(&self.presale_info_address())
            .unwrap()
    }

    pub fn user_info(&self, buyer: &Pubkey) -> Option<UserInfo> {
        self.lite_svm
            .get_deserialized_account(&derive_user_info(buyer, &presale::ID).0)
    }

    pub fn lamports(&self, address: &Pubkey) -> u64 {
        self.lite_svm
            .get_account(address)
            .map(|account| account.lamports)
            .unwrap_or_default()
    }

    pub fn token_balance(&self, owner: &Pubkey) -> u64 {
        let address = get_associated_token_address(owner, &self.token_mint.pubkey());
        self.lite_svm
            .get_deserialized_account::<TokenAccount>(&address)
            .map(|account| account.amount)
            .unwrap_or_default()
    }

    pub fn custody_balance(&self) -> u64 {
        self.lite_svm
            .get_deserialized_account::<TokenAccount>(&self.custody_address())
            .map(|account| account.amount)
            .unwrap_or_default()
    }

    fn process_as_authority(
        &mut self,
        accounts: Vec<AccountMeta>,
        data: Vec<u8>,
    ) -> Result<(), TransactionError> {
        let instruction = Instruction {
            program_id: presale::ID,
            accounts,
            data,
        };
        let authority = self.authority.pubkey();
        process_transaction(
            &mut self.lite_svm,
            &[instruction],
            &authority,
            &[self.authority.as_ref()],
        )
    }

    fn process_as_buyer(
        &mut self,
        buyer: &Keypair,
        accounts: Vec<AccountMeta>,
        data: Vec<u8>,
    ) -> Result<(), TransactionError> {
        let instruction = Instruction {
            program_id: presale::ID,
            accounts,
            data,
        };
        process_transaction(&mut self.lite_svm, &[instruction], &buyer.pubkey(), &[buyer])
    }

    pub fn create_presale(&mut self, params: PresaleParams) -> Result<(), TransactionError> {
        let accounts = presale::accounts::CreatePresale {
            presale_info: self.presale_info_address(),
            presale_vault: self.vault_address(),
            authority: self.authority.pubkey(),
            system_program: anchor_lang::system_program::ID,
        }
        .to_account_metas(None);
        let data = presale::instruction::CreatePresale {
            token_mint: self.token_mint.pubkey(),
            soft_cap: params.soft_cap,
            hard_cap: params.hard_cap,
            max_per_address: params.max_per_address,
            price_per_token: params.price_per_token,
        }
        .data();
        self.process_as_authority(accounts, data)
    }

    pub fn deposit_token(&mut self, amount: u64) -> Result<(), TransactionError> {
        let authority = self.authority.pubkey();
        let mint = self.token_mint.pubkey();
        let accounts = presale::accounts::DepositToken {
            presale_info: self.presale_info_address(),
            mint_account: mint,
            from_associated_token_account: get_associated_token_address(&authority, &mint),
            to_associated_token_account: self.custody_address(),
            authority,
            system_program: anchor_lang::system_program::ID,
            token_program: spl_token::ID,
            associated_token_program: anchor_spl::associated_token::ID,
        }
        .to_account_metas(None);
        let data = presale::instruction::DepositToken { amount }.data();
        self.process_as_authority(accounts, data)
    }

    pub fn start_presale(&mut self, start_time: u64, end_time: u64) -> Result<(), TransactionError> {
        let accounts = presale::accounts::StartPresale {
            presale_info: self.presale_info_address(),
            authority: self.authority.pubkey(),
        }
        .to_account_metas(None);
        let data = presale::instruction::StartPresale {
            start_time,
            end_time,
        }
        .data();
        self.process_as_authority(accounts, data)
    }

    pub fn withdraw_sol(&mut self, amount: u64) -> Result<(), TransactionError> {
        let accounts = presale::accounts::WithdrawSol {
            presale_info: self.presale_info_address(),
            presale_vault: self.vault_address(),
            authority: self.authority.pubkey(),
            system_program: anchor_lang::system_program::ID,
        }
        .to_account_metas(None);
        let data = presale::instruction::WithdrawSol { amount }.data();
        self.process_as_authority(accounts, data)
    }

    pub fn buy_token(&mut self, buyer: &Keypair, quote_amount: u64) -> Result<(), TransactionError> {
        let buyer_pubkey = buyer.pubkey();
        let accounts = presale::accounts::BuyToken {
            presale_info: self.presale_info_address(),
            user_info: derive_user_info(&buyer_pubkey, &presale::ID).0,
            presale_vault: self.vault_address(),
            presale_token_account: self.custody_address(),
            buyer: buyer_pubkey,
            system_program: anchor_lang::system_program::ID,
        }
        .to_account_metas(None);
        let data = presale::instruction::BuyToken { quote_amount }.data();
        self.process_as_buyer(buyer, accounts, data)
    }

    pub fn claim_token(&mut self, buyer: &Keypair) -> Result<(), TransactionError> {
        let buyer_pubkey = buyer.pubkey();
        let mint = self.token_mint.pubkey();
        let accounts = presale::accounts::ClaimToken {
            presale_info: self.presale_info_address(),
            user_info: derive_user_info(&buyer_pubkey, &presale::ID).0,
            token_mint: mint,
            presale_token_account: self.custody_address(),
            buyer_token_account: get_associated_token_address(&buyer_pubkey, &mint),
            buyer: buyer_pubkey,
            system_program: anchor_lang::system_program::ID,
            token_program: spl_token::ID,
            associated_token_program: anchor_spl::associated_token::ID,
        }
        .to_account_metas(None);
        let data = presale::instruction::ClaimToken {}.data();
        self.process_as_buyer(buyer, accounts, data)
    }

    pub fn require_refund(&mut self, buyer: &Keypair) -> Result<(), TransactionError> {
        let buyer_pubkey = buyer.pubkey();
        let accounts = presale::accounts::RequireRefund {
            presale_info: self.presale_info_address(),
            user_info: derive_user_info(&buyer_pubkey, &presale::ID).0,
            presale_vault: self.vault_address(),
            buyer: buyer_pubkey,
            system_program: anchor_lang::system_program::ID,
        }
        .to_account_metas(None);
        let data = presale::instruction::RequireRefund {}.data();
        self.process_as_buyer(buyer, accounts, data)
    }
}
