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
pub struct MyMessage {
    name: String,
    age: u32,
    buffer: Vec<u8>,
}

pub struct MyService;

impl RpcService for MyService {
    fn service_name() -> &'static str {
        "my-service"
    }

    fn register_handlers(registry: &mut ServiceRegistry<Self>) {
        registry.add_handler::<MyMessage>();
    }
}

#[taskmatch_rpc::async_trait]
impl Handler<MyMessage> for MyService {
    type Reply = String;

    fn path() -> &'static str {
        "MyMessage"
    }

    async fn on_message(&self, msg: Request<MyMessage>) -> Result<Self::Reply, Status> {
        Ok(msg.into_inner().name)
    }
}

#[tokio::test]
async fn test_basic() {
    let _ = tracing_subscriber::fmt::try_init();

    let addr = test_helper::get_unused_addr();

    let server = Server::listen(addr).await.unwrap();
    server.add_service(MyService);
    println!("Listening to address {}!", addr);

    let channel = Channel::default();
    let rpc_client = RpcClient::<MyService>::new(channel, &addr.to_string()).unwrap();

    let msg1 = MyMessage {
        name: "Bobby".to_string(),
        age: 12,
        buffer: vec![0u8; 32 << 10],
    };

    let resp = rpc_client.send(&msg1, None).await.unwrap();
    assert_eq!(resp, msg1.name);

    let resp = rpc_client
        .send(&msg1, Some(Duration::from_secs(10)))
        .await
        .unwrap();
    assert_eq!(resp, msg1.name);

    server.shutdown();
}

#[tokio::test]
async fn test_shared_channel_many_clients() {
    let addr = test_helper::get_unused_addr();

    let server = Server::listen(addr).await.unwrap();
    server.add_service(MyService);

    let channel = Channel::default();
    let mut tasks = Vec::new();
    for i in 0..16 {
        let rpc_client =
            RpcClient::<MyService>::new(channel.clone(), &addr.to_string()).unwrap();
        tasks.push(tokio::spawn(async move {
            let msg = MyMessage {
                name: format!("worker-{i}"),
                age: i,
                buffer: Vec::new(),
            };
            rpc_client.send(&msg, None).await
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let resp = task.await.unwrap().unwrap();
        assert_eq!(resp, format!("worker-{i}"));
    }
}
