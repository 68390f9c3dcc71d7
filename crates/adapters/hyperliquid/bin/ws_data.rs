// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Streams public market data for one coin until CTRL+C.
//!
//! Usage: `hyperliquid-ws-data [COIN] [trades|book|bbo|candles|allmids|all]`
//!
//! The network is taken from `HYPERLIQUID_NET` and the endpoint from `HYPERLIQUID_WS_URL`.

use std::{env, time::Duration};

use hyperstream_hyperliquid::{
    HyperliquidWebSocketClient, HyperliquidWsConfig, HyperliquidWsMessage,
    websocket::signals::Signals,
};
use hyperstream_network::logging::init_tracing;

fn log_message(message: &HyperliquidWsMessage) {
    match message {
        HyperliquidWsMessage::Trades { data } => {
            tracing::info!("Trade update: {} trades", data.len());
            for trade in data {
                tracing::debug!(
                    coin = %trade.coin,
                    side = %trade.side,
                    px = %trade.px,
                    sz = %trade.sz,
                    time = trade.time,
                    "trade"
                );
            }
        }
        HyperliquidWsMessage::L2Book { data } => {
            tracing::info!(
                "L2 book update: coin={}, bids={}, asks={}",
                data.coin,
                data.levels[0].len(),
                data.levels[1].len()
            );
        }
        HyperliquidWsMessage::Bbo { data } => {
            let [bid, ask] = &data.bbo;
            tracing::info!(
                "BBO update: coin={}, bid={}, ask={}",
                data.coin,
                bid.as_ref().map_or("-", |level| level.px.as_str()),
                ask.as_ref().map_or("-", |level| level.px.as_str()),
            );
        }
        HyperliquidWsMessage::Candle { data } => {
            tracing::info!(
                "Candle update: coin={}, interval={}, close={}",
                data.s,
                data.i,
                data.c
            );
        }
        HyperliquidWsMessage::AllMids { data } => {
            tracing::info!("All mids update: {} markets", data.mids.len());
        }
        other => tracing::info!("Received {} message", other.channel()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let args: Vec<String> = env::args().collect();
    let coin = args.get(1).map_or("BTC", String::as_str);
    let subscription_type = args.get(2).map_or("all", String::as_str);

    let config = HyperliquidWsConfig::from_env()?;
    tracing::info!("Network: {}", config.network);
    tracing::info!("Subscription type: {subscription_type}");
    tracing::info!("Coin: {coin}");

    let signals = Signals::new()
        .with_connectivity_lost(|reason| tracing::error!("Connectivity lost: {reason}"));
    let client = HyperliquidWebSocketClient::new(config)?.with_signals(signals);

    // Subscribing before connecting queues the requests until the socket is up
    match subscription_type {
        "trades" => {
            client.subscribe_trades(coin, log_message)?;
        }
        "book" | "l2book" | "orderbook" => {
            client.subscribe_book(coin, log_message)?;
        }
        "bbo" => {
            client.subscribe_bbo(coin, log_message)?;
        }
        "candles" | "klines" => {
            client.subscribe_candle(coin, "1m", log_message)?;
        }
        "allmids" => {
            client.subscribe_all_mids(log_message)?;
        }
        "all" => {
            client.subscribe_trades(coin, log_message)?;
            client.subscribe_book(coin, log_message)?;
            client.subscribe_bbo(coin, log_message)?;
        }
        _ => {
            tracing::error!("Unknown subscription type: {subscription_type}");
            tracing::info!("Available types: trades, book, bbo, candles, allmids, all");
            tracing::info!("Example: {} ETH trades", args[0]);
            return Ok(());
        }
    }

    client.connect().await;
    if let Err(e) = client.wait_until_ready(Duration::from_secs(30)).await {
        tracing::warn!("{e}");
    }

    tracing::info!("Waiting for data, press CTRL+C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Received SIGINT, closing connection...");
    client.disconnect().await;
    tracing::info!("Done");

    Ok(())
}
