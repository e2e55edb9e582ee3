use crate::{
    Error,
    Result,
    dice_types::{
        DiceGame,
        GameResultFilter,
    },
    game::{
        BetReceipt,
        ContractSettings,
        GameRecord,
        PendingBet,
        RollOutcome,
    },
    provider::DiceContract,
    wallets::Prompt,
};
use ethers::{
    contract::parse_log,
    providers::Middleware,
    types::{
        Address,
        TransactionReceipt,
        U64,
        U256,
    },
    utils::format_ether,
};
use std::sync::Arc;

/// `rollDice` binding for one sending account. When an approver is set the
/// user confirms every transaction before it is signed.
pub struct ContractProxy<M> {
    contract: DiceGame<M>,
    from: Address,
    approver: Option<Arc<dyn Prompt>>,
}

impl<M: Middleware> ContractProxy<M> {
    pub fn new(
        address: Address,
        client: Arc<M>,
        from: Address,
        approver: Option<Arc<dyn Prompt>>,
    ) -> Self {
        Self {
            contract: DiceGame::new(address, client),
            from,
            approver,
        }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    fn approve(&self, bet: &PendingBet) -> Result<()> {
        let Some(approver) = &self.approver else {
            return Ok(());
        };
        let message = format!(
            "Send {} ETH to rollDice({}) at {:?}?",
            format_ether(bet.bet_amount_wei),
            bet.chosen_number,
            self.address()
        );
        if approver.confirm(&message)? {
            Ok(())
        } else {
            Err(Error::UserRejected)
        }
    }
}

impl<M: Middleware + 'static> DiceContract for ContractProxy<M> {
    async fn roll_dice(&self, bet: &PendingBet) -> Result<BetReceipt> {
        self.approve(bet)?;
        let call = self
            .contract
            .roll_dice(bet.chosen_number.get())
            .value(bet.bet_amount_wei)
            .from(self.from);
        let pending = call.send().await.map_err(Error::from_contract)?;
        let tx_hash = pending.tx_hash();
        tracing::info!(?tx_hash, number = %bet.chosen_number, "rollDice submitted");
        let receipt = pending
            .confirmations(1)
            .await?
            .ok_or_else(|| Error::TransactionFailed {
                reason: format!("transaction {tx_hash:?} dropped before confirmation"),
            })?;
        if receipt.status == Some(U64::zero()) {
            return Err(Error::TransactionFailed {
                reason: format!("transaction {tx_hash:?} reverted"),
            });
        }
        Ok(BetReceipt {
            tx_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            outcome: roll_outcome(&receipt),
        })
    }

    async fn settings(&self) -> Result<ContractSettings> {
        let min_bet = self.contract.min_bet();
        let max_bet = self.contract.max_bet();
        let house_edge = self.contract.house_edge();
        let game_count = self.contract.get_game_count();
        let owner = self.contract.owner();
        let (min_bet, max_bet, house_edge, game_count, owner) = futures::try_join!(
            min_bet.call(),
            max_bet.call(),
            house_edge.call(),
            game_count.call(),
            owner.call(),
        )
        .map_err(Error::from_contract)?;
        Ok(ContractSettings {
            min_bet,
            max_bet,
            house_edge,
            game_count,
            owner,
        })
    }

    async fn game(&self, index: u64) -> Result<GameRecord> {
        let call = self.contract.games(U256::from(index));
        let (player, bet_amount, chosen_number, dice_result, won) =
            call.call().await.map_err(Error::from_contract)?;
        Ok(GameRecord {
            index,
            player,
            bet_amount,
            chosen_number,
            dice_result,
            won,
        })
    }
}

fn roll_outcome(receipt: &TransactionReceipt) -> Option<RollOutcome> {
    receipt
        .logs
        .iter()
        .find_map(|log| parse_log::<GameResultFilter>(log.clone()).ok())
        .map(RollOutcome::from)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::{
        error::bet_failure_message,
        game::DiceNumber,
    };
    use ethers::{
        abi::{
            Token,
            encode,
        },
        providers::{
            JsonRpcError,
            MockProvider,
            MockResponse,
            Provider,
        },
        utils::parse_ether,
    };

    fn proxy_answering(error: JsonRpcError) -> ContractProxy<Provider<MockProvider>> {
        let (provider, mock) = Provider::mocked();
        mock.push_response(MockResponse::Error(error));
        ContractProxy::new(
            Address::from_low_u64_be(0xD1CE),
            Arc::new(provider),
            Address::from_low_u64_be(0xA11CE),
            None,
        )
    }

    fn bet() -> PendingBet {
        PendingBet {
            chosen_number: DiceNumber::new(4).unwrap(),
            bet_amount_wei: parse_ether("0.01").unwrap(),
        }
    }

    #[tokio::test]
    async fn roll_dice__wallet_rejection_reads_as_cancelled() {
        // given
        let proxy = proxy_answering(JsonRpcError {
            code: 4001,
            message: "User rejected the request.".to_string(),
            data: None,
        });

        // when
        let err = proxy.roll_dice(&bet()).await.unwrap_err();

        // then
        assert!(matches!(err, Error::UserRejected));
        assert_eq!(bet_failure_message(&err), "Transaction cancelled");
    }

    #[tokio::test]
    async fn roll_dice__revert_reason_becomes_transaction_failure() {
        // given
        let mut revert = vec![0x08, 0xc3, 0x79, 0xa0];
        revert.extend(encode(&[Token::String("Bet too high".to_string())]));
        let proxy = proxy_answering(JsonRpcError {
            code: 3,
            message: "execution reverted: Bet too high".to_string(),
            data: Some(serde_json::Value::String(format!(
                "0x{}",
                hex::encode(revert)
            ))),
        });

        // when
        let err = proxy.roll_dice(&bet()).await.unwrap_err();

        // then
        let Error::TransactionFailed { reason } = &err else {
            panic!("expected a transaction failure, got {err:?}");
        };
        assert!(reason.contains("Bet too high"));
        assert!(bet_failure_message(&err).starts_with("Error: "));
    }

    #[tokio::test]
    async fn roll_dice__declined_approval_sends_nothing() {
        // given
        struct Decline;
        impl Prompt for Decline {
            fn password(&self, _: &str) -> std::io::Result<Option<String>> {
                Ok(None)
            }
            fn confirm(&self, _: &str) -> std::io::Result<bool> {
                Ok(false)
            }
        }
        let (provider, _mock) = Provider::mocked();
        let proxy = ContractProxy::new(
            Address::from_low_u64_be(0xD1CE),
            Arc::new(provider),
            Address::from_low_u64_be(0xA11CE),
            Some(Arc::new(Decline)),
        );

        // when
        let err = proxy.roll_dice(&bet()).await.unwrap_err();

        // then
        assert!(matches!(err, Error::UserRejected));
    }
}
