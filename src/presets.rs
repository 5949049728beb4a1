//! Ready-made handles for common backing services.
//!
//! Each preset pairs a [`ServiceSpec`] with a protocol-agnostic checker, so
//! none of them pull in a client library. Callers wanting a stricter probe
//! can build their own handle from the same spec.

use crate::config::Settings;
use crate::container::{Container, ServiceSpec};
use crate::error::Result;
use crate::readiness::{ExecChecker, TcpChecker};

pub const PORT_MONGO: &str = "27017";
pub const PORT_REDIS: &str = "6379";
pub const PORT_NATS: &str = "4222";
pub const PORT_NSQD: &str = "4150";
pub const PORT_ETCD: &str = "2379";
pub const PORT_POSTGRES: &str = "5432";

fn tcp_preset(spec: ServiceSpec, port: &str, settings: &Settings) -> Container {
    Container::builder(spec, TcpChecker::new(port).with_settings(settings))
        .settings(settings)
        .build()
}

pub fn mongo() -> Container {
    mongo_with(&Settings::default())
}

/// [`mongo`] polled and probed per `settings`. Every preset has a `_with` variant.
pub fn mongo_with(settings: &Settings) -> Container {
    let spec = ServiceSpec::new("mongo", "mongo").tag("5.0").expose(PORT_MONGO);
    tcp_preset(spec, PORT_MONGO, settings)
}

pub fn mongo_dsn(c: &Container) -> Result<String> {
    c.address("mongodb", PORT_MONGO)
}

pub fn redis() -> Container {
    redis_with(&Settings::default())
}

pub fn redis_with(settings: &Settings) -> Container {
    let spec = ServiceSpec::new("redis", "redis").tag("7-alpine").expose(PORT_REDIS);
    tcp_preset(spec, PORT_REDIS, settings)
}

pub fn redis_addr(c: &Container) -> Result<String> {
    c.address("", PORT_REDIS)
}

pub fn nats() -> Container {
    nats_with(&Settings::default())
}

pub fn nats_with(settings: &Settings) -> Container {
    let spec = ServiceSpec::new("nats", "nats").tag("2.9-alpine").expose(PORT_NATS);
    tcp_preset(spec, PORT_NATS, settings)
}

pub fn nats_url(c: &Container) -> Result<String> {
    c.address("nats", PORT_NATS)
}

pub fn nsqd() -> Container {
    nsqd_with(&Settings::default())
}

pub fn nsqd_with(settings: &Settings) -> Container {
    let spec = ServiceSpec::new("nsqd", "nsqio/nsq")
        .tag("v1.2.1")
        .cmd(["nsqd"])
        .expose(PORT_NSQD);
    tcp_preset(spec, PORT_NSQD, settings)
}

pub fn nsqd_addr(c: &Container) -> Result<String> {
    c.address("", PORT_NSQD)
}

pub fn etcd() -> Container {
    etcd_with(&Settings::default())
}

pub fn etcd_with(settings: &Settings) -> Container {
    let spec = ServiceSpec::new("etcd", "docker.io/bitnami/etcd")
        .tag("3.5")
        .env("ALLOW_NONE_AUTHENTICATION", "yes")
        .expose(PORT_ETCD);
    tcp_preset(spec, PORT_ETCD, settings)
}

pub fn etcd_endpoint(c: &Container) -> Result<String> {
    c.address("", PORT_ETCD)
}

/// Postgres with trust authentication for the `postgres` user.
///
/// Postgres accepts TCP connections during its init restart, so readiness
/// is judged by `pg_isready` inside the container instead.
pub fn postgres() -> Container {
    postgres_with(&Settings::default())
}

pub fn postgres_with(settings: &Settings) -> Container {
    let spec = ServiceSpec::new("postgres", "postgres")
        .tag("16-alpine")
        .env("POSTGRES_HOST_AUTH_METHOD", "trust")
        .expose(PORT_POSTGRES);
    let checker = ExecChecker::new("pg_isready -h 127.0.0.1 -U postgres").with_settings(settings);
    Container::builder(spec, checker).settings(settings).build()
}

pub fn postgres_dsn(c: &Container) -> Result<String> {
    let host_port = c.address("", PORT_POSTGRES)?;
    Ok(format!(
        "postgres://postgres@{}/postgres?sslmode=disable",
        host_port
    ))
}
