// src/generator/outbound.rs
//
// 各协议族的出站构建器

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::consts::{
    BROWSER_USER_AGENT, DEFAULT_HTTPS_PORTS, RANDOM_PATH_LENGTH, TAG_CHAIN, TAG_FRAGMENT,
    TAG_PROXY, USER_LEVEL, WARP_MTU, WS_EARLY_DATA,
};
use crate::common::error::Result;
use crate::common::utils::{base64_to_decimal, encode_base64, random_path, split_list};
use crate::generator::model::{
    ForwardUser, GrpcSettings, HttpRequestHeader, HttpResponseHeader, Mux, NoiseValue, Outbound,
    OutboundProtocol, RealitySettings, ServerEntry, ServerSettings, Sockopt, StreamSettings,
    TcpHeader, TcpSettings, TlsSettings, VlessUser, VnextServer, VnextSettings, WireguardPeer,
    WireguardSettings, WsSettings,
};
use crate::generator::settings::{
    ChainProxyParams, ChainSecurity, ChainTransport, ForwardProxyParams, ProxySettings,
    RequestContext, VlessChainParams, WarpAccount, WireguardParams,
};

/// WebSocket 隧道协议
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelProtocol {
    Vless,
    Trojan,
}

impl fmt::Display for TunnelProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelProtocol::Vless => write!(f, "VLESS"),
            TunnelProtocol::Trojan => write!(f, "Trojan"),
        }
    }
}

/// WireGuard 客户端变体
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarpClient {
    #[default]
    Xray,
    Nikang,
}

impl fmt::Display for WarpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarpClient::Xray => write!(f, "xray"),
            WarpClient::Nikang => write!(f, "nikang"),
        }
    }
}

/// 隧道出站参数
#[derive(Debug, Clone)]
pub struct TunnelParams<'a> {
    pub tag: &'a str,
    pub address: &'a str,
    pub port: u16,
    // WebSocket Host 头
    pub host: &'a str,
    // TLS SNI
    pub sni: &'a str,
    // 非空时以 Base64 形式附加到路径
    pub proxy_ip: &'a str,
    // 经由分片出站拨号
    pub fragment: bool,
    pub allow_insecure: bool,
    pub enable_ipv6: bool,
}

/// 出站描述的构建入口，每个协议族一个变体
#[derive(Debug, Clone)]
pub enum OutboundSpec<'a> {
    Vless(TunnelParams<'a>),
    Trojan(TunnelParams<'a>),
    Wireguard {
        settings: &'a ProxySettings,
        accounts: &'a [WarpAccount],
        endpoint: &'a str,
        is_chain: bool,
        client: WarpClient,
    },
    Chain(&'a ChainProxyParams),
}

impl OutboundSpec<'_> {
    pub fn build(&self, ctx: &RequestContext) -> Result<Outbound> {
        match self {
            OutboundSpec::Vless(params) => {
                Ok(build_tunnel_outbound(TunnelProtocol::Vless, ctx, params))
            }
            OutboundSpec::Trojan(params) => {
                Ok(build_tunnel_outbound(TunnelProtocol::Trojan, ctx, params))
            }
            OutboundSpec::Wireguard {
                settings,
                accounts,
                endpoint,
                is_chain,
                client,
            } => build_warp_outbound(settings, accounts, endpoint, *is_chain, *client),
            OutboundSpec::Chain(params) => Ok(build_chain_outbound(params)),
        }
    }
}

fn is_https_port(port: u16) -> bool {
    DEFAULT_HTTPS_PORTS.contains(&port)
}

// 随机路径，可附带 Base64 编码的代理 IP
fn tunnel_path(prefix: &str, proxy_ip: &str) -> String {
    let encoded = if proxy_ip.is_empty() {
        String::new()
    } else {
        format!("/{}", encode_base64(proxy_ip))
    };
    format!("/{}{}{}{}", prefix, random_path(RANDOM_PATH_LENGTH), encoded, WS_EARLY_DATA)
}

/// 构建 VLESS / Trojan 的 WebSocket 出站
///
/// 仅当端口属于默认 HTTPS 端口时启用 TLS。
pub fn build_tunnel_outbound(
    protocol: TunnelProtocol,
    ctx: &RequestContext,
    params: &TunnelParams<'_>,
) -> Outbound {
    let mut headers = BTreeMap::new();
    headers.insert("Host".to_string(), params.host.to_string());

    let (outbound_protocol, path) = match protocol {
        TunnelProtocol::Vless => {
            headers.insert("User-Agent".to_string(), BROWSER_USER_AGENT.to_string());
            let settings = VnextSettings {
                vnext: vec![VnextServer {
                    address: params.address.to_string(),
                    port: params.port,
                    users: vec![VlessUser {
                        id: ctx.user_id.clone(),
                        encryption: "none".to_string(),
                        flow: None,
                        level: USER_LEVEL,
                        security: None,
                    }],
                }],
            };
            (OutboundProtocol::Vless(settings), tunnel_path("", params.proxy_ip))
        }
        TunnelProtocol::Trojan => {
            let settings = ServerSettings {
                servers: vec![ServerEntry {
                    address: params.address.to_string(),
                    port: params.port,
                    password: Some(ctx.trojan_password.clone()),
                    users: None,
                    level: Some(USER_LEVEL),
                }],
            };
            (OutboundProtocol::Trojan(settings), tunnel_path("tr", params.proxy_ip))
        }
    };

    let mut stream = StreamSettings {
        network: Some("ws".to_string()),
        security: Some("none".to_string()),
        ws_settings: Some(WsSettings {
            headers,
            path: Some(path),
        }),
        ..Default::default()
    };

    if is_https_port(params.port) {
        stream.security = Some("tls".to_string());
        stream.tls_settings = Some(TlsSettings {
            allow_insecure: params.allow_insecure,
            fingerprint: Some("randomized".to_string()),
            alpn: vec!["h2".to_string(), "http/1.1".to_string()],
            server_name: Some(params.sni.to_string()),
        });
    }

    stream.sockopt = Some(if params.fragment {
        Sockopt {
            dialer_proxy: Some(TAG_FRAGMENT.to_string()),
            ..Default::default()
        }
    } else {
        Sockopt {
            dialer_proxy: None,
            tcp_keep_alive_idle: Some(60),
            tcp_no_delay: Some(true),
            domain_strategy: Some(
                if params.enable_ipv6 { "UseIPv4v6" } else { "UseIPv4" }.to_string(),
            ),
        }
    });

    Outbound {
        mux: None,
        protocol: outbound_protocol,
        stream_settings: Some(stream),
        tag: params.tag.to_string(),
    }
}

/// 构建 WireGuard 出站
///
/// 直连跳标记为 `proxy`；链式跳标记为 `chain` 并经由 `proxy` 拨号。
/// 噪声参数只用于 NikaNG 客户端的直连跳。
pub fn build_warp_outbound(
    settings: &ProxySettings,
    accounts: &[WarpAccount],
    endpoint: &str,
    is_chain: bool,
    client: WarpClient,
) -> Result<Outbound> {
    let params = WireguardParams::from_accounts(accounts, is_chain)?;

    let mut wireguard = WireguardSettings {
        address: params.addresses,
        mtu: WARP_MTU,
        peers: vec![WireguardPeer {
            endpoint: endpoint.to_string(),
            public_key: params.public_key,
            keep_alive: 5,
        }],
        reserved: base64_to_decimal(&params.reserved)?,
        secret_key: params.private_key,
        wnoise: None,
        wnoisecount: None,
        wpayloadsize: None,
        wnoisedelay: None,
    };

    if client == WarpClient::Nikang && !is_chain {
        wireguard.wnoise = Some(settings.nikang_noise_mode.clone());
        wireguard.wnoisecount = Some(NoiseValue::from_range(
            settings.noise_count_min,
            settings.noise_count_max,
        ));
        wireguard.wpayloadsize = Some(NoiseValue::from_range(
            settings.noise_size_min,
            settings.noise_size_max,
        ));
        wireguard.wnoisedelay = Some(NoiseValue::from_range(
            settings.noise_delay_min,
            settings.noise_delay_max,
        ));
    }

    let stream_settings = is_chain.then(|| StreamSettings {
        sockopt: Some(Sockopt {
            dialer_proxy: Some(TAG_PROXY.to_string()),
            tcp_keep_alive_idle: Some(100),
            tcp_no_delay: Some(true),
            domain_strategy: None,
        }),
        ..Default::default()
    });

    Ok(Outbound {
        mux: None,
        protocol: OutboundProtocol::Wireguard(wireguard),
        stream_settings,
        tag: if is_chain { TAG_CHAIN } else { TAG_PROXY }.to_string(),
    })
}

// 链式出站的公共拨号参数
fn chain_sockopt() -> Sockopt {
    Sockopt {
        dialer_proxy: Some(TAG_PROXY.to_string()),
        tcp_no_delay: Some(true),
        ..Default::default()
    }
}

fn build_forward_outbound(params: &ForwardProxyParams, http: bool) -> Outbound {
    let settings = ServerSettings {
        servers: vec![ServerEntry {
            address: params.host.clone(),
            port: params.port,
            password: None,
            users: Some(vec![ForwardUser {
                user: params.user.clone(),
                pass: params.pass.clone(),
                level: USER_LEVEL,
            }]),
            level: None,
        }],
    };

    Outbound {
        mux: Some(Mux::default()),
        protocol: if http {
            OutboundProtocol::Http(settings)
        } else {
            OutboundProtocol::Socks(settings)
        },
        stream_settings: Some(StreamSettings {
            network: Some("tcp".to_string()),
            sockopt: Some(chain_sockopt()),
            ..Default::default()
        }),
        tag: TAG_CHAIN.to_string(),
    }
}

fn split_optional(value: &Option<String>) -> Vec<String> {
    value.as_deref().map(split_list).unwrap_or_default()
}

fn build_vless_chain_outbound(params: &VlessChainParams) -> Outbound {
    let mut stream = StreamSettings {
        network: Some(params.transport.as_str().to_string()),
        security: Some(params.security.as_str().to_string()),
        sockopt: Some(chain_sockopt()),
        ..Default::default()
    };

    match params.security {
        ChainSecurity::Tls => {
            stream.tls_settings = Some(TlsSettings {
                allow_insecure: false,
                fingerprint: params.fp.clone(),
                alpn: split_optional(&params.alpn),
                server_name: params.sni.clone(),
            });
        }
        ChainSecurity::Reality => {
            stream.reality_settings = Some(RealitySettings {
                fingerprint: params.fp.clone(),
                public_key: params.pbk.clone(),
                server_name: params.sni.clone(),
                short_id: params.sid.clone(),
                spider_x: params.spx.clone(),
            });
        }
        ChainSecurity::None => {}
    }

    // 伪装为 HTTP 的 TCP 头
    if params.header_type.as_deref() == Some("http") {
        let mut request_headers = BTreeMap::new();
        request_headers.insert("Host".to_string(), split_optional(&params.host));
        let mut response_headers = BTreeMap::new();
        response_headers.insert(
            "Content-Type".to_string(),
            vec!["application/octet-stream".to_string()],
        );

        stream.tcp_settings = Some(TcpSettings {
            header: TcpHeader {
                request: Some(HttpRequestHeader {
                    headers: request_headers,
                    method: "GET".to_string(),
                    path: split_optional(&params.path),
                    version: "1.1".to_string(),
                }),
                response: Some(HttpResponseHeader {
                    headers: response_headers,
                    reason: "OK".to_string(),
                    status: "200".to_string(),
                    version: "1.1".to_string(),
                }),
                kind: "http".to_string(),
            },
        });
    }

    match params.transport {
        ChainTransport::Tcp => {
            if params.security != ChainSecurity::Reality && params.header_type.is_none() {
                stream.tcp_settings = Some(TcpSettings {
                    header: TcpHeader {
                        request: None,
                        response: None,
                        kind: "none".to_string(),
                    },
                });
            }
        }
        ChainTransport::Ws => {
            let mut headers = BTreeMap::new();
            if let Some(host) = &params.host {
                headers.insert("Host".to_string(), host.clone());
            }
            stream.ws_settings = Some(WsSettings {
                headers,
                path: params.path.clone(),
            });
        }
        ChainTransport::Grpc => {
            stream.grpc_settings = Some(GrpcSettings {
                authority: params.authority.clone(),
                multi_mode: params.mode.as_deref() == Some("multi"),
                service_name: params.service_name.clone(),
            });
        }
    }

    // reality 与 gRPC 不支持多路复用
    let mux = match (params.security, params.transport) {
        (ChainSecurity::Reality, _) | (_, ChainTransport::Grpc) => None,
        _ => Some(Mux::default()),
    };

    Outbound {
        mux,
        protocol: OutboundProtocol::Vless(VnextSettings {
            vnext: vec![VnextServer {
                address: params.host_name.clone(),
                port: params.port,
                users: vec![VlessUser {
                    id: params.uuid.clone(),
                    encryption: "none".to_string(),
                    flow: params.flow.clone(),
                    level: USER_LEVEL,
                    security: Some("auto".to_string()),
                }],
            }],
        }),
        stream_settings: Some(stream),
        tag: TAG_CHAIN.to_string(),
    }
}

/// 构建链式上游出站，标记为 `chain` 并经由 `proxy` 拨号
pub fn build_chain_outbound(params: &ChainProxyParams) -> Outbound {
    match params {
        ChainProxyParams::Socks(forward) => build_forward_outbound(forward, false),
        ChainProxyParams::Http(forward) => build_forward_outbound(forward, true),
        ChainProxyParams::Vless(vless) => build_vless_chain_outbound(vless),
    }
}
