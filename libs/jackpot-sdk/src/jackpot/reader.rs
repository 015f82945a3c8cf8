use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use common::amount::TokenAmount;
use common::interfaces::erc20::IERC20;
use common::interfaces::jackpot::IJackpot;
use common::interfaces::jackpot_pool::IJackpotPool;
use serde::{Deserialize, Serialize};

use crate::chain::{decode_return, ChainAccessor, ContractCall, ReadRetry};
use crate::config::JackpotConfig;
use crate::errors::ReadError;

/// Pool state as reported by the pool contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub pool_id: U256,
    pub total_tickets: U256,
    pub ticket_price: U256,
    pub max_tickets_per_user: U256,
    pub end_time: U256,
    pub is_active: bool,
}

/// Fees are quoted against this many basis points.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Snapshot of the current round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotOverview {
    pub ticket_price: U256,
    pub jackpot_amount: U256,
    pub fee_bps: U256,
    pub last_jackpot_end_time: U256,
    pub seconds_until_draw: u64,
    /// One-in-N chance per ticket, `None` when it cannot be computed
    pub odds: Option<U256>,
}

/// An account's standing in the current round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Tickets bought this round, scaled by the fee-adjusted bps denominator
    pub tickets_purchased_total_bps: U256,
    pub winnings_claimable: U256,
    pub active: bool,
}

/// Read-only views of the jackpot, pool and token contracts.
pub struct JackpotReader {
    chain: Arc<dyn ChainAccessor>,
    config: Arc<JackpotConfig>,
    retry: ReadRetry,
}

impl JackpotReader {
    pub fn new(chain: Arc<dyn ChainAccessor>, config: Arc<JackpotConfig>) -> Self {
        let retry = ReadRetry::from_config(&config);
        Self {
            chain,
            config,
            retry,
        }
    }

    pub fn with_retry(mut self, retry: ReadRetry) -> Self {
        self.retry = retry;
        self
    }

    async fn read_value<C: SolCall>(
        &self,
        to: Address,
        call: &C,
        what: &'static str,
    ) -> Result<C::Return, ReadError> {
        let call = ContractCall::new(to, call);
        let chain = &self.chain;

        self.retry
            .run(what, || {
                let call = call.clone();
                async move {
                    let data = chain.read(call).await?;
                    decode_return::<C>(&data)
                }
            })
            .await
    }

    pub async fn ticket_price(&self) -> Result<U256, ReadError> {
        self.read_value(self.config.contracts.jackpot, &IJackpot::ticketPriceCall {}, "ticketPrice")
            .await
    }

    pub async fn token_name(&self) -> Result<String, ReadError> {
        self.read_value(self.config.contracts.token, &IERC20::nameCall {}, "name")
            .await
    }

    pub async fn token_symbol(&self) -> Result<String, ReadError> {
        self.read_value(self.config.contracts.token, &IERC20::symbolCall {}, "symbol")
            .await
    }

    pub async fn token_decimals(&self) -> Result<u8, ReadError> {
        self.read_value(self.config.contracts.token, &IERC20::decimalsCall {}, "decimals")
            .await
    }

    pub async fn token_balance(&self, owner: Address) -> Result<TokenAmount, ReadError> {
        let raw = self
            .read_value(
                self.config.contracts.token,
                &IERC20::balanceOfCall { account: owner },
                "balanceOf",
            )
            .await?;
        Ok(TokenAmount::from_raw(raw, self.config.token_decimals))
    }

    /// Current prize: the larger of the LP and user pool totals.
    pub async fn jackpot_amount(&self) -> Result<U256, ReadError> {
        let jackpot = self.config.contracts.jackpot;
        let (lp_total, user_total) = tokio::try_join!(
            self.read_value(jackpot, &IJackpot::lpPoolTotalCall {}, "lpPoolTotal"),
            self.read_value(jackpot, &IJackpot::userPoolTotalCall {}, "userPoolTotal"),
        )?;
        Ok(lp_total.max(user_total))
    }

    pub async fn fee_bps(&self) -> Result<U256, ReadError> {
        self.read_value(self.config.contracts.jackpot, &IJackpot::feeBpsCall {}, "feeBps")
            .await
    }

    pub async fn last_jackpot_end_time(&self) -> Result<U256, ReadError> {
        self.read_value(
            self.config.contracts.jackpot,
            &IJackpot::lastJackpotEndTimeCall {},
            "lastJackpotEndTime",
        )
        .await
    }

    /// Seconds from `now` (unix seconds) until the next draw, zero if overdue.
    pub async fn seconds_until_draw_at(&self, now: u64) -> Result<u64, ReadError> {
        let jackpot = self.config.contracts.jackpot;
        let (last_end, duration) = tokio::try_join!(
            self.last_jackpot_end_time(),
            self.read_value(
                jackpot,
                &IJackpot::roundDurationInSecondsCall {},
                "roundDurationInSeconds"
            ),
        )?;
        Ok(remaining_seconds(last_end, duration, now))
    }

    pub async fn seconds_until_draw(&self) -> Result<u64, ReadError> {
        self.seconds_until_draw_at(unix_now()).await
    }

    pub async fn overview(&self) -> Result<JackpotOverview, ReadError> {
        let now = unix_now();
        let (ticket_price, jackpot_amount, fee_bps, last_jackpot_end_time, seconds_until_draw) = tokio::try_join!(
            self.ticket_price(),
            self.jackpot_amount(),
            self.fee_bps(),
            self.last_jackpot_end_time(),
            self.seconds_until_draw_at(now),
        )?;

        Ok(JackpotOverview {
            odds: jackpot_odds(jackpot_amount, ticket_price, fee_bps),
            ticket_price,
            jackpot_amount,
            fee_bps,
            last_jackpot_end_time,
            seconds_until_draw,
        })
    }

    /// One-in-N chance that a single ticket wins the current jackpot.
    /// `None` when the ticket price or the fee leaves nothing to divide by.
    pub async fn odds(&self) -> Result<Option<U256>, ReadError> {
        let (jackpot_amount, ticket_price, fee_bps) =
            tokio::try_join!(self.jackpot_amount(), self.ticket_price(), self.fee_bps())?;
        Ok(jackpot_odds(jackpot_amount, ticket_price, fee_bps))
    }

    pub async fn user_info(&self, user: Address) -> Result<UserInfo, ReadError> {
        let info = self
            .read_value(
                self.config.contracts.jackpot,
                &IJackpot::usersInfoCall { user },
                "usersInfo",
            )
            .await?;

        Ok(UserInfo {
            tickets_purchased_total_bps: info.ticketsPurchasedTotalBps,
            winnings_claimable: info.winningsClaimable,
            active: info.active,
        })
    }

    /// Whole tickets `user` bought in the current round.
    pub async fn tickets_this_round(&self, user: Address) -> Result<U256, ReadError> {
        let (info, fee_bps) = tokio::try_join!(self.user_info(user), self.fee_bps())?;
        Ok(tickets_from_bps(info.tickets_purchased_total_bps, fee_bps))
    }

    /// Pool details, `None` when the pool cannot be read.
    pub async fn pool_info(&self, pool_id: U256) -> Option<PoolInfo> {
        let result = self
            .read_value(
                self.config.contracts.pool,
                &IJackpotPool::getPoolInfoCall { poolId: pool_id },
                "getPoolInfo",
            )
            .await;

        match result {
            Ok(info) => Some(PoolInfo {
                pool_id,
                total_tickets: info.totalTickets,
                ticket_price: info.ticketPrice,
                max_tickets_per_user: info.maxTicketsPerUser,
                end_time: info.endTime,
                is_active: info.isActive,
            }),
            Err(e) => {
                tracing::warn!(pool_id = %pool_id, "Failed to read pool info: {}", e);
                None
            }
        }
    }

    /// Tickets `holder` owns in the pool, zero when the read fails.
    pub async fn user_tickets(&self, pool_id: U256, holder: Address) -> U256 {
        let call = ContractCall::new(
            self.config.contracts.pool,
            &IJackpotPool::getUserTicketsCall { poolId: pool_id },
        )
        .from(holder);

        let result = match self.chain.read(call).await {
            Ok(data) => decode_return::<IJackpotPool::getUserTicketsCall>(&data),
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(pool_id = %pool_id, holder = %holder, "Failed to read user tickets: {}", e);
            U256::ZERO
        })
    }
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// The contract credits each ticket with `10_000 - fee_bps` basis points.
fn tickets_from_bps(tickets_bps: U256, fee_bps: U256) -> U256 {
    let per_ticket = U256::from(BPS_DENOMINATOR).saturating_sub(fee_bps);
    if per_ticket.is_zero() {
        return U256::ZERO;
    }
    tickets_bps / per_ticket
}

/// jackpot / (price * (1 - fee)), kept in integers.
fn jackpot_odds(jackpot_amount: U256, ticket_price: U256, fee_bps: U256) -> Option<U256> {
    let net_share = U256::from(BPS_DENOMINATOR).saturating_sub(fee_bps);
    let net_price = ticket_price.checked_mul(net_share)?;
    if net_price.is_zero() {
        return None;
    }
    let scaled = jackpot_amount.checked_mul(U256::from(BPS_DENOMINATOR))?;
    Some(scaled / net_price)
}

fn remaining_seconds(last_end: U256, duration: U256, now: u64) -> u64 {
    let next_draw = last_end.saturating_add(duration);
    let remaining = next_draw.saturating_sub(U256::from(now));
    u64::try_from(remaining).unwrap_or(u64::MAX)
}
