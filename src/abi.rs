#[allow(clippy::too_many_arguments)]
pub mod perpetual {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        contract LidoAPYPerpetual {
            /// Position state as stored by the contract.
            struct Position {
                uint256 size;
                uint256 collateral;
                uint256 leverage;
                uint256 entryAPY;
                uint256 takeProfitAPY;
                uint256 stopLossAPY;
                bool isLong;
                bool isOpen;
            }

            event APYUpdated(uint256 newAPY);
            event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);
            event PositionOpened(
                address indexed trader,
                address indexed token,
                bool isLong,
                uint256 size,
                uint256 collateral,
                uint256 leverage,
                uint256 entryAPY
            );
            event PositionClosed(
                address indexed trader,
                address indexed token,
                bool isLong,
                uint256 profit
            );
            event PositionLiquidated(
                address indexed trader,
                address indexed token,
                bool isLong,
                uint256 collateral
            );
            event TokenAdded(address token);
            event TokenRemoved(address token);

            error OwnableUnauthorizedAccount(address account);
            error OwnableInvalidOwner(address owner);

            function openPosition(
                address token,
                bool isLong,
                uint256 collateral,
                uint256 leverage,
                uint256 takeProfitAPY,
                uint256 stopLossAPY
            ) external;
            function closePosition(address token) external;
            function getAPY() external view returns (uint256);
            function currentAPY() external view returns (uint256);
            function getPosition(address trader, address token) external view returns (Position memory);
            function updateAPY(uint256 _newAPY) external;
            function addToken(address token) external;
            function removeToken(address token) external;
            function owner() external view returns (address);
        }
    );
}
