//! Cross-exchange opportunity detection for one market per call

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::{
    arbitrage::{
        CandidateInputs, calculate_arbitrage, confidence_score, gas_cost_in_quote, gas_cost_native, net_profit,
        spread_percent,
    },
    config::{DetectionSettings, GasDenomination, MarketConfig},
    errors::{BotError, BotResult},
    network::ChainClient,
    pools::ExchangeAdapter,
    types::{Opportunity, PriceImpact, QuoteResult, TradingPair},
    validation::{PriceBand, ProfitGates, usable_quotes, validate_opportunity},
    volatility::PriceHistoryStore,
};

/// A configured market with its adapters resolved.
pub struct MarketContext {
    pub pair: TradingPair,
    pub trade_size: Decimal,
    pub adapters: Vec<Arc<ExchangeAdapter>>,
    pub band: PriceBand,
    pub gates: ProfitGates,
    pub gas_denomination: GasDenomination,
}

impl MarketContext {
    pub fn resolve(
        market: &MarketConfig,
        detection: &DetectionSettings,
        adapters: &HashMap<String, Arc<ExchangeAdapter>>,
    ) -> BotResult<Self> {
        let pair = market.pair()?;
        let resolved = market
            .exchanges
            .iter()
            .map(|id| {
                adapters
                    .get(id)
                    .cloned()
                    .ok_or_else(|| BotError::Config(format!("{}: unknown exchange '{}'", pair, id)))
            })
            .collect::<BotResult<Vec<_>>>()?;

        Ok(Self {
            pair,
            trade_size: market.trade_size,
            adapters: resolved,
            band: PriceBand {
                min: market.min_price,
                max: market.max_price,
            },
            gates: ProfitGates::for_market(detection, market),
            gas_denomination: market.gas_denomination,
        })
    }

    pub fn adapter(&self, id: &str) -> Option<&Arc<ExchangeAdapter>> {
        self.adapters.iter().find(|a| a.id() == id)
    }
}

pub struct OpportunityDetector {
    chain: Arc<dyn ChainClient>,
    history: Arc<PriceHistoryStore>,
    settings: DetectionSettings,
}

impl OpportunityDetector {
    pub fn new(chain: Arc<dyn ChainClient>, history: Arc<PriceHistoryStore>, settings: DetectionSettings) -> Self {
        Self { chain, history, settings }
    }

    pub fn history(&self) -> &Arc<PriceHistoryStore> {
        &self.history
    }

    /// One detection cycle. `Ok(None)` means nothing worth trading right now.
    pub async fn detect(&self, market: &MarketContext) -> BotResult<Option<Opportunity>> {
        let pair = &market.pair;
        let quotes = join_all(market.adapters.iter().map(|adapter| adapter.get_price(pair))).await;
        let (quotes, rejected) = usable_quotes(quotes, market.band);
        for reason in &rejected {
            debug!("{} quote discarded: {}", pair, reason);
        }
        if quotes.len() < 2 {
            debug!("{}: {} usable quote(s), need two", pair, quotes.len());
            return Ok(None);
        }

        let mid_price = quotes.iter().map(|q| q.price).sum::<Decimal>() / Decimal::from(quotes.len());
        self.history.record_price(pair, mid_price, Utc::now()).await;

        let mut candidates = Vec::new();
        for (i, a) in quotes.iter().enumerate() {
            for b in quotes.iter().skip(i + 1) {
                let spread = spread_percent(a.price, b.price);
                if market.gates.spread_acceptable(spread) {
                    let (buy, sell) = if a.price <= b.price { (a, b) } else { (b, a) };
                    candidates.push((buy, sell, spread));
                }
            }
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        let gas_price = self.chain.gas_price().await?;
        let gas_native = gas_cost_native(self.settings.gas_per_leg, gas_price, self.settings.gas_price_multiplier)?;
        let gas_cost = gas_cost_in_quote(gas_native, market.gas_denomination, mid_price);
        let volatility = self.history.volatility(pair).await;

        let mut impacts: HashMap<String, Option<PriceImpact>> = HashMap::new();
        let mut best: Option<Opportunity> = None;

        for (buy, sell, spread) in candidates {
            let Some(buy_impact) = self.impact_for(market, buy, &mut impacts).await? else {
                continue;
            };
            let Some(sell_impact) = self.impact_for(market, sell, &mut impacts).await? else {
                continue;
            };

            let profit = net_profit(market.trade_size, buy.price, sell.price, gas_cost);
            let notional = market.trade_size * buy.price;
            let validation = validate_opportunity(spread, &buy_impact, &sell_impact, profit, notional, &market.gates);
            if !validation.all_passed {
                debug!(
                    "{} {} -> {} rejected: {}",
                    pair,
                    buy.exchange_id,
                    sell.exchange_id,
                    validation.warnings.join("; ")
                );
                continue;
            }

            let max_impact = buy_impact.max_impact_pct.max(sell_impact.max_impact_pct);
            let confidence = confidence_score(
                spread,
                max_impact,
                market.gates.max_price_impact_pct,
                volatility,
                &self.settings.confidence,
            );
            let opportunity = calculate_arbitrage(CandidateInputs {
                pair,
                buy,
                sell,
                trade_size: market.trade_size,
                max_price_impact_pct: max_impact,
                estimated_gas_cost: gas_cost,
                net_profit: profit,
                confidence_score: confidence,
            });

            let better = match &best {
                None => true,
                Some(current) => {
                    (opportunity.confidence_score, opportunity.net_profit)
                        > (current.confidence_score, current.net_profit)
                }
            };
            if better {
                best = Some(opportunity);
            }
        }

        if let Some(opportunity) = &best {
            info!(
                pair = %pair,
                buy = %opportunity.buy_exchange,
                sell = %opportunity.sell_exchange,
                spread_pct = %opportunity.spread_percent.round_dp(4),
                net_profit = %opportunity.net_profit.round_dp(4),
                confidence = %opportunity.confidence_score.round_dp(3),
                "Arbitrage opportunity detected"
            );
        }
        Ok(best)
    }

    /// Impact for one venue, measured at most once per cycle. `None` when the
    /// venue cannot carry the trade.
    async fn impact_for(
        &self,
        market: &MarketContext,
        quote: &QuoteResult,
        cache: &mut HashMap<String, Option<PriceImpact>>,
    ) -> BotResult<Option<PriceImpact>> {
        if let Some(cached) = cache.get(&quote.exchange_id) {
            return Ok(cached.clone());
        }
        let measured = match market.adapter(&quote.exchange_id) {
            Some(adapter) => {
                match adapter
                    .check_liquidity(&market.pair, market.trade_size, market.gates.max_price_impact_pct)
                    .await
                {
                    Ok(impact) if impact.sufficient_liquidity => Some(impact),
                    Ok(impact) => {
                        debug!(
                            "{} {} impact {:.3}% exceeds {}%",
                            market.pair, quote.exchange_id, impact.max_impact_pct, market.gates.max_price_impact_pct
                        );
                        None
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("{} {} impact check failed: {}", market.pair, quote.exchange_id, e);
                        None
                    }
                }
            }
            None => None,
        };
        cache.insert(quote.exchange_id.clone(), measured.clone());
        Ok(measured)
    }
}
