use std::time::Duration;

use rkyv::{Archive, Deserialize, Serialize};
use taskmatch_rpc::{
    Channel,
    Handler,
    Request,
    RpcClient,
    RpcService,
    Server,
    ServiceRegistry,
    Status,
};

#[repr(C)]
#[derive(Serialize, Deserialize, Archive, Debug)]
#[archive(check_bytes)]
pub struct Sleep {
    millis: u64,
}

pub struct SleepyService;

impl RpcService for SleepyService {
    fn service_name() -> &'static str {
        "sleepy"
    }

    fn register_handlers(registry: &mut ServiceRegistry<Self>) {
        registry.add_handler::<Sleep>();
    }
}

#[taskmatch_rpc::async_trait]
impl Handler<Sleep> for SleepyService {
    /// The deadline the server observed, in milliseconds.
    type Reply = Option<u64>;

    fn path() -> &'static str {
        "Sleep"
    }

    async fn on_message(&self, msg: Request<Sleep>) -> Result<Self::Reply, Status> {
        tokio::time::sleep(Duration::from_millis(msg.millis)).await;
        Ok(msg.deadline().map(|d| d.as_millis() as u64))
    }
}

#[tokio::test]
async fn test_deadline_forwarded() {
    let addr = test_helper::get_unused_addr();

    let server = Server::listen(addr).await.unwrap();
    server.add_service(SleepyService);

    let client = RpcClient::<SleepyService>::new(Channel::default(), &addr.to_string()).unwrap();

    let resp = client.send(&Sleep { millis: 0 }, None).await.unwrap();
    assert_eq!(resp, None, "No deadline should be seen by the server");

    let resp = client
        .send(&Sleep { millis: 0 }, Some(Duration::from_secs(10)))
        .await
        .unwrap();
    assert_eq!(resp, Some(10_000));
}

#[tokio::test]
async fn test_server_aborts_after_deadline() {
    let addr = test_helper::get_unused_addr();

    let server = Server::listen(addr).await.unwrap();
    server.add_service(SleepyService);

    let client = RpcClient::<SleepyService>::new(Channel::default(), &addr.to_string()).unwrap();

    let res = client
        .send(&Sleep { millis: 5_000 }, Some(Duration::from_millis(100)))
        .await;
    assert_eq!(res, Err(Status::timeout()));
}
