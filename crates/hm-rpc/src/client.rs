//! HTTP client for the controller's XML-RPC interface

use crate::error::{RpcError, RpcResult};
use crate::xml::{decode_response, encode_call};
use crate::HomematicRpc;
use async_trait::async_trait;
use hm_core::{
    DeviceAddress, DeviceDescription, LinkInfo, ParamValue, Paramset, ParamsetDescription,
};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, trace};

/// Connection options for [`XmlRpcClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Transport timeout per request
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// XML-RPC client talking to one controller interface (e.g. `http://ccu:2000`)
#[derive(Clone)]
pub struct XmlRpcClient {
    client: Client,
    url: String,
}

impl XmlRpcClient {
    /// Create a client for the interface at `url`
    pub fn new(url: impl Into<String>, options: ClientOptions) -> RpcResult<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|source| RpcError::Transport {
                method: "connect".to_string(),
                source,
            })?;

        Ok(Self { client, url })
    }

    /// Create a client from host and port (`http://{host}:{port}`)
    pub fn from_host(host: &str, port: u16, options: ClientOptions) -> RpcResult<Self> {
        Self::new(format!("http://{}:{}", host, port), options)
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Perform a raw call
    pub async fn call(&self, method: &str, params: &[Value]) -> RpcResult<Value> {
        let shown = Value::from(params.to_vec());
        debug!(method, params = %shown, "Calling remote method");

        let body = encode_call(method, params);
        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|source| RpcError::Transport {
                method: method.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|source| RpcError::Transport {
            method: method.to_string(),
            source,
        })?;
        trace!(method, response = %text, "Raw response");

        decode_response(method, &text)
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[Value],
    ) -> RpcResult<T> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }
}

fn paramset_value(method: &str, paramset: &Paramset) -> RpcResult<Value> {
    serde_json::to_value(paramset).map_err(|e| RpcError::Decode {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl HomematicRpc for XmlRpcClient {
    async fn list_devices(&self) -> RpcResult<Vec<DeviceDescription>> {
        self.call_typed("listDevices", &[]).await
    }

    async fn get_device_description(
        &self,
        address: &DeviceAddress,
    ) -> RpcResult<DeviceDescription> {
        self.call_typed("getDeviceDescription", &[json!(address)]).await
    }

    async fn get_links(&self, address: &str, flags: i32) -> RpcResult<Vec<LinkInfo>> {
        self.call_typed("getLinks", &[json!(address), json!(flags)]).await
    }

    async fn get_link_peers(&self, address: &DeviceAddress) -> RpcResult<Vec<DeviceAddress>> {
        self.call_typed("getLinkPeers", &[json!(address)]).await
    }

    async fn get_paramset(
        &self,
        address: &DeviceAddress,
        paramset_key: &str,
    ) -> RpcResult<Paramset> {
        self.call_typed("getParamset", &[json!(address), json!(paramset_key)]).await
    }

    async fn put_paramset(
        &self,
        address: &DeviceAddress,
        paramset_key: &str,
        paramset: &Paramset,
    ) -> RpcResult<()> {
        let paramset = paramset_value("putParamset", paramset)?;
        self.call("putParamset", &[json!(address), json!(paramset_key), paramset]).await?;
        Ok(())
    }

    async fn set_value(
        &self,
        address: &DeviceAddress,
        key: &str,
        value: &ParamValue,
    ) -> RpcResult<()> {
        self.call("setValue", &[json!(address), json!(key), json!(value)]).await?;
        Ok(())
    }

    async fn add_link(
        &self,
        sender: &DeviceAddress,
        receiver: &DeviceAddress,
        name: &str,
        description: &str,
    ) -> RpcResult<()> {
        self.call(
            "addLink",
            &[json!(sender), json!(receiver), json!(name), json!(description)],
        )
        .await?;
        Ok(())
    }

    async fn remove_link(&self, sender: &DeviceAddress, receiver: &DeviceAddress) -> RpcResult<()> {
        self.call("removeLink", &[json!(sender), json!(receiver)]).await?;
        Ok(())
    }

    async fn get_paramset_description(
        &self,
        address: &DeviceAddress,
        paramset_key: &str,
    ) -> RpcResult<ParamsetDescription> {
        self.call_typed("getParamsetDescription", &[json!(address), json!(paramset_key)]).await
    }
}
