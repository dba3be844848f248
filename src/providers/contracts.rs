//! Bindings for the contracts the relay talks to.

#![allow(missing_docs)]

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IFunctionsRouter {
        struct Subscription {
            uint96 balance;
            address owner;
            uint96 blockedBalance;
            address proposedOwner;
            address[] consumers;
            bytes32 flags;
        }

        function getContractById(bytes32 id) external view returns (address);
        function getSubscription(uint64 subscriptionId) external view returns (Subscription memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IFunctionsCoordinator {
        struct Config {
            uint32 fulfillmentGasPriceOverEstimationBP;
            uint32 feedStalenessSeconds;
            uint32 gasOverheadBeforeCallback;
            uint32 gasOverheadAfterCallback;
            uint32 requestTimeoutSeconds;
            uint72 donFee;
            uint16 maxSupportedRequestDataVersion;
            uint224 fallbackNativePerUnitLink;
        }

        function getConfig() external view returns (Config memory);
        function getWeiPerUnitLink() external view returns (uint256);
        function getAdminFee() external view returns (uint72);
        function getThresholdPublicKey() external view returns (bytes memory);
        function getDONPublicKey() external view returns (bytes memory);
    }
}

sol! {
    /// The consumer contract that builds and sends the oracle request.
    ///
    /// The entry point's name matches the deployed contract.
    #[sol(rpc)]
    interface IReasoningConsumer {
        event RequestSent(bytes32 indexed id);
        event Response(bytes32 indexed requestId, bytes response, bytes err);

        function execureReasoning(bytes encryptedSecretsUrls, uint256 linkFee, string[] contentIds) external returns (bytes32);
        function aiActionId() external view returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    interface IActionRegistry {
        struct Action {
            string name;
            string prompt;
        }

        function getAction(uint256 actionId) external view returns (Action memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
